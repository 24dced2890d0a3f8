//! Tests for the slash command table.

use std::sync::Arc;

use decibel_database::Store;
use decibel_discord::{CommandName, CommandTable, DiscordErrorKind};

#[tokio::test]
async fn test_standard_table_routes_every_command() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(Store::in_memory()?);
    let table = CommandTable::standard(store, 10);

    assert_eq!(
        table.names(),
        vec![
            CommandName::ActiveChannels,
            CommandName::Leaderboard,
            CommandName::Rank
        ]
    );
    assert_eq!(table.definitions().len(), 3);

    for name in ["active-channels", "leaderboard", "rank"] {
        let command = table.get(name)?;
        assert_eq!(command.name().to_string(), name);
    }
    assert!(table.get("Leaderboard").is_err());

    let err = table.get("ping").err().ok_or("ping should be unknown")?;
    assert_eq!(err.kind(), &DiscordErrorKind::UnknownCommand("ping".to_string()));
    Ok(())
}

#[test]
fn test_empty_table() {
    let table = CommandTable::new();
    assert!(table.names().is_empty());
    assert!(table.definitions().is_empty());
    assert!(table.get("rank").is_err());
}
