//! Build script baking the default API endpoint into the binary.

use std::env;

fn main() {
    // Load .env values (useful during development) before option_env! reads them
    let _ = dotenvy::dotenv();

    if let Ok(val) = env::var("ISSUEDESK_API_URL") {
        println!("cargo:rustc-env=ISSUEDESK_API_URL={}", val);
    }

    println!("cargo:rerun-if-env-changed=ISSUEDESK_API_URL");
}
