diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        image -> Nullable<Varchar>,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    companies (id) {
        id -> Uuid,
        name -> Varchar,
        website -> Nullable<Varchar>,
        industry -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contacts (id) {
        id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Varchar,
        phone -> Nullable<Varchar>,
        job_title -> Nullable<Varchar>,
        company_id -> Nullable<Uuid>,
        lead_score -> Int4,
        lead_status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tags (id) {
        id -> Uuid,
        name -> Varchar,
        color -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        ticket_number -> Varchar,
        subject -> Varchar,
        description -> Text,
        status -> Varchar,
        priority -> Varchar,
        category -> Varchar,
        contact_id -> Uuid,
        company_id -> Nullable<Uuid>,
        assigned_to_id -> Nullable<Uuid>,
        created_by_id -> Uuid,
        due_date -> Nullable<Timestamptz>,
        resolved_at -> Nullable<Timestamptz>,
        closed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_tags (ticket_id, tag_id) {
        ticket_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        user_id -> Uuid,
        content -> Text,
        is_internal -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    activities (id) {
        id -> Uuid,
        activity_type -> Varchar,
        action -> Varchar,
        description -> Text,
        user_id -> Uuid,
        ticket_id -> Nullable<Uuid>,
        metadata -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(contacts -> companies (company_id));
diesel::joinable!(tickets -> contacts (contact_id));
diesel::joinable!(tickets -> companies (company_id));
diesel::joinable!(ticket_tags -> tickets (ticket_id));
diesel::joinable!(ticket_tags -> tags (tag_id));
diesel::joinable!(comments -> tickets (ticket_id));
diesel::joinable!(comments -> users (user_id));
diesel::joinable!(activities -> users (user_id));
diesel::joinable!(activities -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(
    users, companies, contacts, tags, tickets, ticket_tags, comments, activities,
);
