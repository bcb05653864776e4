// Diesel schema for the edge-cache's Postgres-backed tables (§6 persisted-state
// layouts; §4.9 replicated column subset). The primary store is reached over RPC
// (see `adapters::doc_store`), never through this schema.

diesel::table! {
    articles (id) {
        id -> Text,
        slug -> Text,
        title -> Text,
        description -> Nullable<Text>,
        source -> Text,
        category -> Nullable<Text>,
        country -> Nullable<Text>,
        published_at -> Nullable<Timestamptz>,
        embedding -> Nullable<crate::adapters::vector_index::PgVector>,
    }
}

diesel::table! {
    keywords (id) {
        id -> Text,
        name -> Text,
        category_id -> Nullable<Text>,
        usage_count -> Int8,
    }
}

diesel::table! {
    categories (id) {
        id -> Text,
        name -> Text,
        emoji -> Nullable<Text>,
        color -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(articles, keywords, categories,);
