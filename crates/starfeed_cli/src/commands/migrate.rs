use console::style;
use starfeed::db;
use starfeed::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?;
            if pending.is_empty() {
                println!("Schema is up to date.");
                return Ok(());
            }
            for migration in &pending {
                println!("  {} {}", style("+").green(), migration.name());
            }
            Migrator::up(&db, None).await?;
            println!("Applied {} migration(s).", pending.len());
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("Rolled back the latest migration.");
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(&db).await?;
            let pending = Migrator::get_pending_migrations(&db).await?;
            for migration in &applied {
                println!("  {} {}", style("applied").green(), migration.name());
            }
            for migration in &pending {
                println!("  {} {}", style("pending").yellow(), migration.name());
            }
            if applied.is_empty() && pending.is_empty() {
                println!("No migrations defined.");
            }
        }
        MigrateAction::Fresh => {
            println!("Dropping the starfeed tables and rebuilding the schema...");
            Migrator::fresh(&db).await?;
            println!("Schema rebuilt.");
        }
    }

    Ok(())
}
