diesel::table! {
    certificates (serial) {
        serial -> Text,
        registration_id -> BigInt,
        issuer -> Text,
        digest -> Text,
        der -> Binary,
        not_before -> BigInt,
        not_after -> BigInt,
    }
}

diesel::table! {
    certificate_status (serial) {
        serial -> Text,
        status -> Text,
        subscriber_approved -> Bool,
        last_updated -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(certificates, certificate_status,);
