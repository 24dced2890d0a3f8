// Mirrors schema.sql at the crate root.

diesel::table! {
    guilds (guild_id) {
        guild_id -> BigInt,
        guild_name -> Text,
    }
}

diesel::table! {
    channels (channel_id) {
        channel_id -> BigInt,
        guild_id -> BigInt,
        channel_name -> Text,
        color_index -> Integer,
    }
}

diesel::table! {
    active_channels (channel_id) {
        channel_id -> BigInt,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> BigInt,
        username -> Text,
    }
}

diesel::table! {
    loudness_leaderboard (guild_id, user_id) {
        guild_id -> BigInt,
        user_id -> BigInt,
        loudness_lufs -> Double,
        message_url -> Text,
        #[sql_name = "timestamp"]
        recorded_at -> Timestamp,
    }
}

diesel::joinable!(active_channels -> channels (channel_id));
diesel::joinable!(channels -> guilds (guild_id));
diesel::joinable!(loudness_leaderboard -> guilds (guild_id));
diesel::joinable!(loudness_leaderboard -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    active_channels,
    channels,
    guilds,
    loudness_leaderboard,
    users,
);
