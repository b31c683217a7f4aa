//! Issue Command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::info;
use wgprov_common::artifacts::qr_terminal;
use wgprov_common::{load_or_setup, IssueReport, Issuer};

use super::{load_registry, Context};
use crate::output::{print_info, print_json, print_success, print_warning, OutputFormat};
use crate::prompt::{prompt_identity, PromptProfileSource};

#[derive(Args)]
pub struct IssueArgs {
    /// Client identity (prompted for when omitted)
    pub identity: Option<String>,

    /// Skip the PNG and terminal QR codes
    #[arg(long)]
    pub no_qr: bool,
}

/// Machine-readable summary of an issuance
#[derive(Serialize)]
struct IssueSummary {
    identity: String,
    address: String,
    public_key: String,
    windows_config: String,
    mikrotik_config: String,
    server_peer_config: String,
    qr_png: Option<String>,
}

impl From<&IssueReport> for IssueSummary {
    fn from(report: &IssueReport) -> Self {
        let written = &report.written;
        Self {
            identity: report.issuance.identity.clone(),
            address: report.issuance.address.to_string(),
            public_key: report.issuance.keypair.public_key.clone(),
            windows_config: written.windows.display().to_string(),
            mikrotik_config: written.mikrotik.display().to_string(),
            server_peer_config: written.server_peer.display().to_string(),
            qr_png: written.qr_png.as_ref().map(|p| p.display().to_string()),
        }
    }
}

pub async fn execute(args: IssueArgs, ctx: &Context) -> Result<()> {
    ctx.ensure_data_dir()?;

    let profile_store = ctx.profile_store();
    let profile = load_or_setup(&profile_store, &PromptProfileSource::default())?;

    let registry_store = ctx.registry_store();
    let mut registry = load_registry(&registry_store, &profile)?;

    let identity = match args.identity {
        Some(identity) => identity,
        None => prompt_identity()?,
    };

    let keygen = ctx.keygen();
    let qr = ctx.settings.qr_png && !args.no_qr;
    let sink = ctx.sink(qr);
    let issuer = Issuer::new(&registry_store, &keygen, &sink)
        .with_options(ctx.settings.render_options());

    let report = issuer.issue(&identity, &profile, &mut registry).await?;
    info!(
        "Issued {} -> {} ({} clients registered)",
        report.issuance.identity,
        report.issuance.address,
        registry.len()
    );

    if ctx.format == OutputFormat::Json {
        print_json(&IssueSummary::from(&report));
        return Ok(());
    }

    let written = &report.written;
    print_success(&format!(
        "Issued {} with address {}",
        report.issuance.identity, report.issuance.address
    ));
    println!("Configuration files generated:");
    println!("- {} (Windows)", written.windows.display());
    println!("- {} (MikroTik)", written.mikrotik.display());
    println!("- {} (Server Peer Configuration)", written.server_peer.display());

    if let Some(png) = &written.qr_png {
        print_info(&format!("QR Code for mobile saved as: {}", png.display()));
    }
    if !args.no_qr && ctx.format == OutputFormat::Table {
        match qr_terminal(&report.rendered.windows) {
            Ok(code) => println!("{}", code),
            Err(e) => print_warning(&format!("Cannot display QR code: {}", e)),
        }
    }

    Ok(())
}
