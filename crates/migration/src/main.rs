use std::str::FromStr;

use sea_orm::Database;
use sea_orm_migration::prelude::*;

/// Same file the `fleetledger` binary opens with the shipped `settings.toml`.
const DEFAULT_DATABASE_URL: &str = "sqlite:./fleetledger.db?mode=rwc";

const USAGE: &str = "usage: migration [up [N] | down [N] | fresh | status]
  DATABASE_URL selects the ledger database (default ./fleetledger.db)";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Apply pending migrations, all of them when `None`.
    Up(Option<u32>),
    /// Roll back the last `n` migrations.
    Down(u32),
    Fresh,
    Status,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, String> {
        let steps = |arg: Option<&String>| -> Result<Option<u32>, String> {
            arg.map(|n| u32::from_str(n).map_err(|_| format!("invalid step count {n:?}")))
                .transpose()
        };
        match args {
            [] => Ok(Self::Up(None)),
            [cmd, rest @ ..] if rest.len() <= 1 => match cmd.as_str() {
                "up" => Ok(Self::Up(steps(rest.first())?)),
                "down" => Ok(Self::Down(steps(rest.first())?.unwrap_or(1))),
                "fresh" if rest.is_empty() => Ok(Self::Fresh),
                "status" if rest.is_empty() => Ok(Self::Status),
                other => Err(format!("unknown command {other:?}")),
            },
            _ => Err("too many arguments".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(reason) => {
            eprintln!("{reason}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&url).await?;

    match command {
        Command::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Command::Down(steps) => migration::Migrator::down(&db, Some(steps)).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        let args: Vec<String> = args.iter().map(|a| ToString::to_string(a)).collect();
        Command::parse(&args)
    }

    #[test]
    fn no_arguments_applies_everything() {
        assert_eq!(parse(&[]), Ok(Command::Up(None)));
    }

    #[test]
    fn step_counts() {
        assert_eq!(parse(&["up", "2"]), Ok(Command::Up(Some(2))));
        assert_eq!(parse(&["down"]), Ok(Command::Down(1)));
        assert_eq!(parse(&["down", "3"]), Ok(Command::Down(3)));
        assert!(parse(&["down", "-1"]).is_err());
    }

    #[test]
    fn rejects_unknown_or_extra_arguments() {
        assert_eq!(parse(&["status"]), Ok(Command::Status));
        assert!(parse(&["fresh", "1"]).is_err());
        assert!(parse(&["seed"]).is_err());
        assert!(parse(&["up", "1", "2"]).is_err());
    }
}
