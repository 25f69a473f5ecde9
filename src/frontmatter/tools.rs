//! Tool grants declared under `tools`.

use super::SemanticIssue;
use super::raw::{RawCustomTool, RawGitHubTool, env_text};
use crate::schema::FieldPath;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Read-only GitHub tools granted when `tools.github.allowed` is not given.
pub const DEFAULT_GITHUB_TOOLS: [&str; 20] = [
    "get_code_scanning_alert",
    "get_commit",
    "get_file_contents",
    "get_issue",
    "get_issue_comments",
    "get_me",
    "get_pull_request",
    "get_pull_request_comments",
    "get_pull_request_files",
    "get_pull_request_reviews",
    "get_pull_request_status",
    "list_branches",
    "list_commits",
    "list_issues",
    "list_pull_requests",
    "list_tags",
    "search_code",
    "search_issues",
    "search_repositories",
    "search_users",
];

/// Git subcommands granted when a safe output needs to commit changes.
pub const GIT_COMMANDS: [&str; 7] = [
    "git checkout:*",
    "git branch:*",
    "git switch:*",
    "git add:*",
    "git rm:*",
    "git commit:*",
    "git merge:*",
];

/// Normalized tool grants.
///
/// The GitHub tool server is always present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolGrants {
    pub github: GitHubTool,
    pub edit: bool,
    pub web_fetch: bool,
    pub web_search: bool,
    pub bash: Option<BashGrant>,
    /// User-declared tool servers by name.
    pub servers: BTreeMap<String, McpServer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitHubTool {
    /// Explicit allow-list; `None` grants [`DEFAULT_GITHUB_TOOLS`].
    pub allowed: Option<Vec<String>>,
    pub image_version: Option<String>,
}

impl GitHubTool {
    pub fn allowed_tools(&self) -> Vec<String> {
        match &self.allowed {
            Some(allowed) => allowed.clone(),
            None => DEFAULT_GITHUB_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BashGrant {
    /// `bash:` with no list.
    Unrestricted,
    /// Command patterns such as `git status` or `make:*`.
    Commands(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    pub transport: McpTransport,
    /// Tools the engine may call; empty means all.
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
    /// A stdio server run from a container image, optionally behind an
    /// egress proxy.
    Container {
        image: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        network_allowed: Option<Vec<String>>,
    },
}

impl McpServer {
    pub fn is_http(&self) -> bool {
        matches!(self.transport, McpTransport::Http { .. })
    }
}

impl ToolGrants {
    /// Names of user-declared servers using HTTP transport.
    pub fn http_servers(&self) -> Vec<&str> {
        self.servers
            .iter()
            .filter(|(_, server)| server.is_http())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Containerized servers with a network allow-list, in name order.
    pub fn proxied_servers(&self) -> Vec<(&str, &[String])> {
        self.servers
            .iter()
            .filter_map(|(name, server)| match &server.transport {
                McpTransport::Container {
                    network_allowed: Some(domains),
                    ..
                } => Some((name.as_str(), domains.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// All tool-server names in rendering order: `github` first, then
    /// user-declared servers by name.
    pub fn server_names(&self) -> Vec<String> {
        std::iter::once("github".to_string())
            .chain(self.servers.keys().cloned())
            .collect()
    }

    /// A copy with the git subcommands added to the bash grant.
    ///
    /// The result is a union: an unrestricted grant stays unrestricted and
    /// existing command patterns are kept.
    pub fn with_git_commands(&self) -> Self {
        let mut widened = self.clone();
        widened.bash = Some(match &self.bash {
            Some(BashGrant::Unrestricted) => BashGrant::Unrestricted,
            Some(BashGrant::Commands(commands)) => {
                let mut commands = commands.clone();
                commands.extend(GIT_COMMANDS.iter().map(|c| c.to_string()));
                BashGrant::Commands(commands)
            }
            None => BashGrant::Commands(GIT_COMMANDS.iter().map(|c| c.to_string()).collect()),
        });
        widened
    }

    /// Union of two grant sets. Entries of `self` win on name clashes.
    pub fn merged_with(&self, other: &ToolGrants) -> Self {
        let mut merged = self.clone();
        merged.edit |= other.edit;
        merged.web_fetch |= other.web_fetch;
        merged.web_search |= other.web_search;

        merged.bash = match (&self.bash, &other.bash) {
            (Some(BashGrant::Unrestricted), _) | (_, Some(BashGrant::Unrestricted)) => {
                Some(BashGrant::Unrestricted)
            }
            (Some(BashGrant::Commands(a)), Some(BashGrant::Commands(b))) => {
                Some(BashGrant::Commands(a.union(b).cloned().collect()))
            }
            (Some(grant), None) | (None, Some(grant)) => Some(grant.clone()),
            (None, None) => None,
        };

        merged.github.allowed = match (&self.github.allowed, &other.github.allowed) {
            (Some(a), Some(b)) => {
                let mut allowed = a.clone();
                allowed.extend(b.iter().filter(|tool| !a.contains(tool)).cloned());
                Some(allowed)
            }
            (Some(a), None) => Some(a.clone()),
            (None, b) => b.clone(),
        };
        if merged.github.image_version.is_none() {
            merged.github.image_version = other.github.image_version.clone();
        }

        for (name, server) in &other.servers {
            merged
                .servers
                .entry(name.clone())
                .or_insert_with(|| server.clone());
        }
        merged
    }
}

pub(super) fn parse_tools(
    tools: Option<&Mapping>,
    base: &FieldPath,
    issues: &mut Vec<SemanticIssue>,
) -> ToolGrants {
    let mut grants = ToolGrants::default();
    let Some(tools) = tools else {
        return grants;
    };

    for (key, value) in tools {
        let Some(name) = key.as_str() else { continue };
        let path = base.child(name);
        match name {
            "github" => {
                if let Some(raw) = decode::<RawGitHubTool>(value, &path, issues) {
                    grants.github = GitHubTool {
                        allowed: raw.allowed,
                        image_version: raw.docker_image_version,
                    };
                }
            }
            "edit" => grants.edit = true,
            "web-fetch" => grants.web_fetch = true,
            "web-search" => grants.web_search = true,
            "bash" => {
                grants.bash = Some(match value.as_sequence() {
                    Some(commands) => BashGrant::Commands(
                        commands
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    ),
                    None => BashGrant::Unrestricted,
                })
            }
            _ => {
                if let Some(raw) = decode::<RawCustomTool>(value, &path, issues)
                    && let Some(server) = custom_server(raw, &path.child("mcp"), issues)
                {
                    grants.servers.insert(name.to_string(), server);
                }
            }
        }
    }
    grants
}

fn custom_server(raw: RawCustomTool, path: &FieldPath, issues: &mut Vec<SemanticIssue>) -> Option<McpServer> {
    let mcp = raw.mcp;
    let declared = mcp.transport.as_deref();
    let is_http = declared == Some("http") || (declared.is_none() && mcp.url.is_some());

    let transport = if is_http {
        let Some(url) = mcp.url else {
            issues.push(SemanticIssue::new(
                path.child("type"),
                "http tool servers need a 'url'",
            ));
            return None;
        };
        if mcp.command.is_some() || mcp.container.is_some() {
            issues.push(SemanticIssue::new(
                path.child("url"),
                "http tool servers cannot also declare 'command' or 'container'",
            ));
        }
        McpTransport::Http {
            url,
            headers: mcp.headers,
        }
    } else {
        if mcp.url.is_some() {
            issues.push(SemanticIssue::new(
                path.child("url"),
                "'url' is only valid for http tool servers",
            ));
        }
        let env = env_text(Some(mcp.env));
        match (mcp.command, mcp.container) {
            (Some(_), Some(_)) => {
                issues.push(SemanticIssue::new(
                    path.child("container"),
                    "declare either 'command' or 'container', not both",
                ));
                return None;
            }
            (Some(command), None) => {
                if mcp.network.is_some() {
                    issues.push(
                        SemanticIssue::new(
                            path.child("network"),
                            "network restrictions require a 'container' tool server",
                        )
                        .with_hint("run the server from a container image to restrict its egress"),
                    );
                }
                McpTransport::Stdio {
                    command,
                    args: mcp.args,
                    env,
                }
            }
            (None, Some(image)) => McpTransport::Container {
                image,
                args: mcp.args,
                env,
                network_allowed: mcp.network.map(|network| network.allowed),
            },
            (None, None) => {
                issues.push(
                    SemanticIssue::new(
                        path.clone(),
                        "stdio tool servers need a 'command' or a 'container'",
                    )
                    .with_hint("e.g. 'command: npx' with 'args', or 'container: org/image:tag'"),
                );
                return None;
            }
        }
    };

    Some(McpServer {
        transport,
        allowed: raw.allowed,
    })
}

/// Deserialize one tool entry. `null` decodes as the type's default.
fn decode<T>(value: &Value, path: &FieldPath, issues: &mut Vec<SemanticIssue>) -> Option<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if value.is_null() {
        return Some(T::default());
    }
    match serde_yaml::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            issues.push(SemanticIssue::new(path.clone(), e.to_string()));
            None
        }
    }
}
