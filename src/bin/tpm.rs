// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-alone panel process.
//!
//! Reads the optional file named by `TPM_CONFIG_FILE`, layers `TPM_*`
//! environment variables on top, prepares every document and serves the
//! status endpoint.

use std::env;
use std::error::Error;
use tpm::{Panel, error_fmt, info_fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut loader = Panel::loader();
    if let Ok(path) = env::var("TPM_CONFIG_FILE") {
        loader = loader.with_config_file(&path);
    }
    let loader = loader.with_env_vars();

    let panel = match loader.build() {
        Ok(panel) => panel,
        Err(e) => {
            eprintln!("Failed to start panel: {e}");
            return Err(e.into());
        }
    };

    for path in panel.document_paths() {
        info_fmt!("Startup", "Managing {}", path.display());
    }
    info_fmt!("Startup", "Proxy API at {}", panel.settings().api_url);

    if let Err(e) = panel.serve().await {
        error_fmt!("Panel", "Status server failed: {}", e);
        return Err(e.into());
    }

    info_fmt!("Panel", "Stopped gracefully");
    Ok(())
}
