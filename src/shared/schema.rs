diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        notification_email -> Nullable<Varchar>,
        role -> Varchar,
        division -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Varchar,
        description -> Text,
        image_url -> Nullable<Varchar>,
        category -> Nullable<Varchar>,
        target_division -> Varchar,
        routed_divisions -> Array<Text>,
        nlp_confidence -> Float8,
        nlp_keywords -> Nullable<Array<Text>>,
        is_nlp_overridden -> Bool,
        original_nlp_division -> Nullable<Varchar>,
        override_reason -> Nullable<Text>,
        overridden_by -> Nullable<Uuid>,
        overridden_at -> Nullable<Timestamptz>,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    category_division_mapping (id) {
        id -> Uuid,
        nlp_category -> Varchar,
        target_division -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        admin_id -> Uuid,
        ticket_id -> Uuid,
        user_id -> Uuid,
        title -> Varchar,
        message -> Text,
        notification_reason -> Varchar,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, tickets, category_division_mapping, notifications);
