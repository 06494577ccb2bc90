//! Server initialization
//!
//! Tracing setup and the `serve_stdio!` entry point shared by MCP servers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing to stderr. Stdout carries the MCP protocol.
///
/// `RUST_LOG` filters as usual on top of a `<crate_name>=info` default.
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    let directive = format!("{}=info", crate_name);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let registry = tracing_subscriber::registry().with(filter);

    if json_logs(std::env::var("LOG_FORMAT").ok().as_deref()) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

fn json_logs(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Generate `main` for an MCP server served over stdio.
///
/// The server type must provide `fn from_env() -> anyhow::Result<Self>`.
/// A construction error is logged and returned from `main`, so the process
/// exits non-zero before the transport is opened.
///
/// ```rust,ignore
/// use my_mcp::MyServer;
///
/// mcp_common::serve_stdio!(MyServer, "my_mcp");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP Server"));

            let server = match <$server_type>::from_env() {
                Ok(server) => server,
                Err(e) => {
                    tracing::error!("Failed to start: {:#}", e);
                    return Err(e);
                }
            };
            let service = server.serve(rmcp::transport::stdio()).await?;

            tracing::info!("Server running, waiting for requests...");

            service.waiting().await?;

            tracing::info!("Server shutting down");
            Ok(())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_logs() {
        assert!(json_logs(Some("json")));
        assert!(json_logs(Some("JSON ")));
        assert!(!json_logs(Some("text")));
        assert!(!json_logs(None));
    }
}
