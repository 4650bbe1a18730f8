/**
 * rolegate probe
 *
 * Small command-line harness for exercising a gateway against a live
 * backend. Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY` (a `.env` file is
 * honoured) and prints each outcome as JSON.
 *
 * Commands that act as a signed-in caller (`whoami`, `check`, `set-role`)
 * sign in first with `ROLEGATE_EMAIL` / `ROLEGATE_PASSWORD`.
 */

use rolegate::gateway::SessionGateway;
use rolegate::shared::{GatewayConfig, Role};
use serde_json::json;
use uuid::Uuid;

const USAGE: &str = "usage: rolegate-probe <command>

commands:
  signup <email> <password>
  signin <email> <password>
  whoami
  check <role>
  set-role <user-id> <role>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command: Vec<&str> = args.iter().map(String::as_str).collect();

    let config = GatewayConfig::from_env()?;
    tracing::debug!("Using backend at {}", config.url);
    let gateway = SessionGateway::connect(config)?;

    let output = match command.as_slice() {
        ["signup", email, password] => serde_json::to_value(gateway.sign_up(email, password).await)?,
        ["signin", email, password] => serde_json::to_value(gateway.sign_in(email, password).await)?,
        ["whoami"] => {
            sign_in_from_env(&gateway).await?;
            serde_json::to_value(gateway.current_user().await)?
        }
        ["check", role] => {
            sign_in_from_env(&gateway).await?;
            serde_json::to_value(gateway.check_access(*role).evaluate().await)?
        }
        ["set-role", user_id, role] => {
            let user_id = Uuid::parse_str(user_id)?;
            sign_in_from_env(&gateway).await?;
            let updated = gateway.update_user_role(user_id, Role::from(*role)).await;
            json!({ "success": updated })
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn sign_in_from_env(gateway: &SessionGateway) -> Result<(), Box<dyn std::error::Error>> {
    let email = std::env::var("ROLEGATE_EMAIL").map_err(|_| "ROLEGATE_EMAIL not set")?;
    let password = std::env::var("ROLEGATE_PASSWORD").map_err(|_| "ROLEGATE_PASSWORD not set")?;

    gateway.sign_in(&email, &password).await.into_result()?;
    Ok(())
}
