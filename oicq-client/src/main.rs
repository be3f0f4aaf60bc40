//! Interactive login demo against a gateway of your choosing.
//!
//! Fill in the constants below, then:
//!   cargo run -p oicq-client

use std::net::Ipv4Addr;

use oicq_client::{Client, LoginFlow};
use oicq_wtlogin::{KeySet, RequestContext, UserPassword};

// ── Fill these in ─────────────────────────────────────────────────────────────
const GATEWAY: (Ipv4Addr, u16) = (Ipv4Addr::new(14, 17, 22, 33), 8080);
const UIN: u32 = 0;
const PASSWORD: &str = "YOUR_PASSWORD";
const IMEI: &str = "867335032183349";
// ──────────────────────────────────────────────────────────────────────────────

fn main() {
    if let Err(e) = run() {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    if UIN == 0 || PASSWORD == "YOUR_PASSWORD" {
        eprintln!("Edit UIN and PASSWORD at the top of src/main.rs");
        std::process::exit(1);
    }

    // No reactor drivers needed: the transport is blocking and runs on
    // spawn_blocking.
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    runtime.block_on(login())
}

async fn login() -> Result<(), Box<dyn std::error::Error>> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as u32;

    let mut template = RequestContext::new(0, UserPassword::from(""), now, KeySet::generate()?);
    template.imei = IMEI.to_string();

    let client = Client::new(template, GATEWAY);
    let mut flow = client.login(UIN, PASSWORD).await?;

    loop {
        flow = match flow {
            LoginFlow::LoggedIn(session) => {
                let tokens = session.tokens()?;
                println!("✓ Logged in ({}B TGT, {}B D2)", tokens.tgt.len(), tokens.d2.len());
                return Ok(());
            }
            LoginFlow::Captcha(challenge) => {
                std::fs::write("captcha.png", &challenge.picture.png)?;
                println!(
                    "Captcha saved to captcha.png ({}x{})",
                    challenge.picture.width, challenge.picture.height
                );
                let code = prompt("Enter the captcha text: ")?;
                challenge.submit(code.trim().to_string()).await?
            }
            LoginFlow::Sms(challenge) => {
                println!("Verification text requested (app id {})", challenge.sms_app_id);
                let challenge = match challenge.request_send().await? {
                    LoginFlow::Sms(challenge) => challenge,
                    other => {
                        flow = other;
                        continue;
                    }
                };
                let code = prompt("Enter the SMS code: ")?;
                challenge.submit(code.trim().to_string()).await?
            }
        };
    }
}

fn prompt(msg: &str) -> Result<String, Box<dyn std::error::Error>> {
    use std::io::{BufRead, Write};
    print!("{msg}");
    std::io::stdout().flush()?;
    let line = std::io::stdin().lock().lines().next().ok_or("stdin closed")??;
    Ok(line)
}
