//! Engine-neutral description of tool servers, rendered by each engine into
//! its own configuration syntax.

use crate::frontmatter::{McpTransport, ToolGrants};
use serde_json::json;
use std::collections::BTreeMap;

/// Directory holding generated tool-server configuration.
pub const TOOL_SERVER_CONFIG_DIR: &str = "/tmp/mcp-config";

/// Image tag of the GitHub tool server when none is configured.
pub const DEFAULT_GITHUB_MCP_VERSION: &str = "sha-09deac4";

const GITHUB_MCP_IMAGE: &str = "ghcr.io/github/github-mcp-server";
const GITHUB_TOKEN_VAR: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Directory of the generated egress proxy files for a tool.
pub fn proxy_dir(name: &str) -> String {
    format!("/tmp/mcp-proxy/{}", name)
}

/// How a tool server is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLaunch {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

/// Launch description for the server called `name`, if it exists.
pub fn server_launch(name: &str, grants: &ToolGrants) -> Option<ServerLaunch> {
    if name == "github" {
        let version = grants
            .github
            .image_version
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_MCP_VERSION);
        return Some(ServerLaunch::Stdio {
            command: "docker".to_string(),
            args: vec![
                "run".to_string(),
                "-i".to_string(),
                "--rm".to_string(),
                "-e".to_string(),
                GITHUB_TOKEN_VAR.to_string(),
                format!("{}:{}", GITHUB_MCP_IMAGE, version),
            ],
            env: BTreeMap::from([(
                GITHUB_TOKEN_VAR.to_string(),
                "${{ secrets.GITHUB_TOKEN }}".to_string(),
            )]),
        });
    }

    let server = grants.servers.get(name)?;
    Some(match &server.transport {
        McpTransport::Stdio { command, args, env } => ServerLaunch::Stdio {
            command: command.clone(),
            args: args.clone(),
            env: env.clone(),
        },
        McpTransport::Http { url, headers } => ServerLaunch::Http {
            url: url.clone(),
            headers: headers.clone(),
        },
        McpTransport::Container {
            network_allowed: Some(_),
            env,
            ..
        } => ServerLaunch::Stdio {
            command: "docker".to_string(),
            args: vec![
                "compose".to_string(),
                "-f".to_string(),
                format!("{}/docker-compose.yml", proxy_dir(name)),
                "run".to_string(),
                "--rm".to_string(),
                name.to_string(),
            ],
            env: env.clone(),
        },
        McpTransport::Container {
            image, args, env, ..
        } => {
            let mut docker_args = vec!["run".to_string(), "-i".to_string(), "--rm".to_string()];
            for key in env.keys() {
                docker_args.push("-e".to_string());
                docker_args.push(key.clone());
            }
            docker_args.push(image.clone());
            docker_args.extend(args.iter().cloned());
            ServerLaunch::Stdio {
                command: "docker".to_string(),
                args: docker_args,
                env: env.clone(),
            }
        }
    })
}

/// JSON object of the form `{"mcpServers": {...}}`, with servers in `names`
/// order. `url_key` is the key an engine expects for HTTP servers.
pub fn render_json_servers(out: &mut String, grants: &ToolGrants, names: &[String], url_key: &str) {
    let entries: Vec<String> = names
        .iter()
        .filter_map(|name| {
            let entry = match server_launch(name, grants)? {
                ServerLaunch::Stdio { command, args, env } => {
                    json!({ "command": command, "args": args, "env": env })
                }
                ServerLaunch::Http { url, headers } => {
                    let mut entry = serde_json::Map::new();
                    entry.insert(url_key.to_string(), json!(url));
                    if !headers.is_empty() {
                        entry.insert("headers".to_string(), json!(headers));
                    }
                    serde_json::Value::Object(entry)
                }
            };
            let body = serde_json::to_string_pretty(&entry).ok()?;
            let key = serde_json::to_string(name).ok()?;
            Some(format!("    {}: {}", key, indent_json(&body, "    ")))
        })
        .collect();

    out.push_str("{\n  \"mcpServers\": {\n");
    out.push_str(&entries.join(",\n"));
    if !entries.is_empty() {
        out.push('\n');
    }
    out.push_str("  }\n}\n");
}

/// Indent every line after the first.
fn indent_json(body: &str, prefix: &str) -> String {
    body.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
