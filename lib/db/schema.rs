diesel::table! {
    survey_results (id) {
        id -> Text,
        customer_id -> Text,
        survey_text -> Text,
        sentiment -> Text,
        score_positive -> Float8,
        score_negative -> Float8,
        score_neutral -> Float8,
        score_mixed -> Float8,
        created_at -> Text,
        expires_at -> Int8,
    }
}
