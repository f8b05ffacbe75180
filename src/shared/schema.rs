diesel::table! {
    chantiers (id) {
        id -> Uuid,
        nom -> Varchar,
        adresse -> Nullable<Text>,
        couleur -> Varchar,
        statut -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ouvriers_internes (id) {
        id -> Uuid,
        nom -> Varchar,
        prenom -> Varchar,
        actif -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sous_traitants (id) {
        id -> Uuid,
        nom -> Varchar,
        specialite -> Nullable<Varchar>,
        actif -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sav_tickets (id) {
        id -> Uuid,
        numero -> Varchar,
        sujet -> Varchar,
        chantier_id -> Nullable<Uuid>,
        statut -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    planning_tasks (id) {
        id -> Uuid,
        titre -> Varchar,
        description -> Nullable<Text>,
        date_debut -> Timestamptz,
        date_fin -> Timestamptz,
        statut -> Varchar,
        chantier_id -> Nullable<Uuid>,
        sav_ticket_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    planning_task_ouvriers (task_id, ouvrier_id) {
        task_id -> Uuid,
        ouvrier_id -> Uuid,
    }
}

diesel::table! {
    planning_task_sous_traitants (task_id, sous_traitant_id) {
        task_id -> Uuid,
        sous_traitant_id -> Uuid,
    }
}

diesel::joinable!(planning_tasks -> chantiers (chantier_id));
diesel::joinable!(planning_tasks -> sav_tickets (sav_ticket_id));
diesel::joinable!(planning_task_ouvriers -> planning_tasks (task_id));
diesel::joinable!(planning_task_ouvriers -> ouvriers_internes (ouvrier_id));
diesel::joinable!(planning_task_sous_traitants -> planning_tasks (task_id));
diesel::joinable!(planning_task_sous_traitants -> sous_traitants (sous_traitant_id));

diesel::allow_tables_to_appear_in_same_query!(
    chantiers,
    ouvriers_internes,
    sous_traitants,
    sav_tickets,
    planning_tasks,
    planning_task_ouvriers,
    planning_task_sous_traitants,
);
