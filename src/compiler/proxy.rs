//! Egress proxy for containerized tool servers with a network allow-list.
//!
//! Each such tool runs on its own Docker network next to a squid proxy that
//! only lets through the allowed domains. Networks get a private
//! `172.28.X.0/24` subnet where `X` is the first byte of the SHA-256 of the
//! tool name; on a collision within one compile the next free value is taken.

use crate::engine::ExecutionStepSpec;
use crate::error::{CompileError, Result};
use crate::frontmatter::{McpTransport, ToolGrants};
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

const SQUID_IMAGE: &str = "ubuntu/squid:latest";
const SQUID_PORT: u16 = 3128;

/// Proxy settings of one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub tool: String,
    /// Third octet of the tool's subnet.
    pub subnet_octet: u8,
    pub domains: Vec<String>,
    pub image: String,
    pub args: Vec<String>,
    pub env_keys: Vec<String>,
}

impl ProxyConfig {
    pub fn subnet(&self) -> String {
        format!("172.28.{}.0/24", self.subnet_octet)
    }

    fn proxy_address(&self) -> String {
        format!("172.28.{}.10", self.subnet_octet)
    }

    fn network_name(&self) -> String {
        format!("awproxy-{}", self.tool)
    }
}

/// Preferred subnet octet of a tool.
pub fn subnet_seed(tool: &str) -> u8 {
    Sha256::digest(tool.as_bytes())[0]
}

/// Assign subnets to `(tool, preferred octet)` pairs in order, probing upward
/// (wrapping) past octets already taken.
pub fn allocate_subnets(seeds: &[(String, u8)]) -> Result<Vec<(String, u8)>> {
    let mut taken = BTreeSet::new();
    let mut allocated = Vec::with_capacity(seeds.len());

    for (tool, seed) in seeds {
        let octet = (0..=u8::MAX)
            .map(|step| seed.wrapping_add(step))
            .find(|candidate| !taken.contains(candidate))
            .ok_or_else(|| {
                CompileError::Internal(format!("no free proxy subnet left for tool '{}'", tool))
            })?;
        taken.insert(octet);
        allocated.push((tool.clone(), octet));
    }
    Ok(allocated)
}

/// Proxy configurations for every network-restricted tool, in name order.
pub fn plan(grants: &ToolGrants) -> Result<Vec<ProxyConfig>> {
    let proxied = grants.proxied_servers();
    let seeds: Vec<(String, u8)> = proxied
        .iter()
        .map(|(name, _)| (name.to_string(), subnet_seed(name)))
        .collect();
    let octets = allocate_subnets(&seeds)?;

    let mut configs = Vec::with_capacity(proxied.len());
    for ((name, domains), (_, octet)) in proxied.into_iter().zip(octets) {
        let Some(McpTransport::Container {
            image, args, env, ..
        }) = grants.servers.get(name).map(|server| &server.transport)
        else {
            continue;
        };
        configs.push(ProxyConfig {
            tool: name.to_string(),
            subnet_octet: octet,
            domains: domains.to_vec(),
            image: image.clone(),
            args: args.clone(),
            env_keys: env.keys().cloned().collect(),
        });
    }
    Ok(configs)
}

pub fn squid_conf(config: &ProxyConfig) -> String {
    format!(
        "http_port {port}\n\
         acl localnet src {subnet}\n\
         acl allowed_domains dstdomain \"/etc/squid/allowed_domains.txt\"\n\
         acl SSL_ports port 443\n\
         acl Safe_ports port 80\n\
         acl Safe_ports port 443\n\
         acl CONNECT method CONNECT\n\
         http_access deny !Safe_ports\n\
         http_access deny CONNECT !SSL_ports\n\
         http_access allow localnet allowed_domains\n\
         http_access deny all\n\
         cache deny all\n\
         access_log stdio:/dev/stdout\n",
        port = SQUID_PORT,
        subnet = config.subnet(),
    )
}

pub fn allowed_domains(config: &ProxyConfig) -> String {
    let mut text = config.domains.join("\n");
    text.push('\n');
    text
}

pub fn docker_compose(config: &ProxyConfig) -> Result<String> {
    let proxy_url = format!("http://squid-proxy:{}", SQUID_PORT);
    let network = config.network_name();

    let mut squid = Mapping::new();
    squid.insert("image".into(), SQUID_IMAGE.into());
    squid.insert("container_name".into(), format!("squid-proxy-{}", config.tool).into());
    squid.insert(
        "volumes".into(),
        Value::Sequence(vec![
            "./squid.conf:/etc/squid/squid.conf:ro".into(),
            "./allowed_domains.txt:/etc/squid/allowed_domains.txt:ro".into(),
        ]),
    );
    let mut address = Mapping::new();
    address.insert("ipv4_address".into(), config.proxy_address().into());
    let mut squid_networks = Mapping::new();
    squid_networks.insert(network.clone().into(), Value::Mapping(address));
    squid.insert("networks".into(), Value::Mapping(squid_networks));

    let mut environment = vec![
        Value::from("PROXY_HOST=squid-proxy"),
        Value::from(format!("PROXY_PORT={}", SQUID_PORT)),
        Value::from(format!("HTTP_PROXY={}", proxy_url)),
        Value::from(format!("HTTPS_PROXY={}", proxy_url)),
    ];
    environment.extend(config.env_keys.iter().map(|key| Value::from(key.as_str())));

    let mut tool = Mapping::new();
    tool.insert("image".into(), config.image.as_str().into());
    tool.insert("container_name".into(), format!("{}-mcp", config.tool).into());
    tool.insert("stdin_open".into(), true.into());
    tool.insert("environment".into(), Value::Sequence(environment));
    if !config.args.is_empty() {
        tool.insert(
            "command".into(),
            Value::Sequence(config.args.iter().map(|a| Value::from(a.as_str())).collect()),
        );
    }
    tool.insert("networks".into(), Value::Sequence(vec![network.clone().into()]));
    tool.insert("depends_on".into(), Value::Sequence(vec!["squid-proxy".into()]));

    let mut services = Mapping::new();
    services.insert("squid-proxy".into(), Value::Mapping(squid));
    services.insert(config.tool.as_str().into(), Value::Mapping(tool));

    let mut subnet = Mapping::new();
    subnet.insert("subnet".into(), config.subnet().into());
    let mut ipam = Mapping::new();
    ipam.insert("config".into(), Value::Sequence(vec![Value::Mapping(subnet)]));
    let mut network_config = Mapping::new();
    network_config.insert("driver".into(), "bridge".into());
    network_config.insert("ipam".into(), Value::Mapping(ipam));
    let mut networks = Mapping::new();
    networks.insert(network.into(), Value::Mapping(network_config));

    let mut compose = Mapping::new();
    compose.insert("services".into(), Value::Mapping(services));
    compose.insert("networks".into(), Value::Mapping(networks));

    serde_yaml::to_string(&compose)
        .map_err(|e| CompileError::Internal(format!("failed to render docker-compose.yml: {}", e)))
}

/// Heredoc terminator that no line of `content` equals.
fn heredoc_delimiter(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let suffix: String = digest.iter().take(4).map(|byte| format!("{:02x}", byte)).collect();
    let mut delimiter = format!("AWFLOW_EOF_{}", suffix);
    while content.lines().any(|line| line.trim_end() == delimiter) {
        delimiter.push('_');
    }
    delimiter
}

/// Shell snippet writing `content` to `path` with a quoted heredoc.
pub fn heredoc(path: &str, content: &str) -> String {
    let delimiter = heredoc_delimiter(content);
    let mut script = format!("cat > {} << '{}'\n{}", path, delimiter, content);
    if !content.ends_with('\n') {
        script.push('\n');
    }
    script.push_str(&delimiter);
    script.push('\n');
    script
}

/// The agent-job step that writes every proxy configuration.
pub fn setup_step(configs: &[ProxyConfig]) -> Result<Option<ExecutionStepSpec>> {
    if configs.is_empty() {
        return Ok(None);
    }
    let mut script = String::new();
    for config in configs {
        let dir = crate::engine::proxy_dir(&config.tool);
        script.push_str(&format!("mkdir -p {}\n", dir));
        script.push_str(&heredoc(&format!("{}/squid.conf", dir), &squid_conf(config)));
        script.push_str(&heredoc(
            &format!("{}/allowed_domains.txt", dir),
            &allowed_domains(config),
        ));
        script.push_str(&heredoc(
            &format!("{}/docker-compose.yml", dir),
            &docker_compose(config)?,
        ));
    }
    Ok(Some(ExecutionStepSpec::run("Setup tool network proxies", script)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::McpServer;
    use std::collections::BTreeMap;

    fn proxied(name: &str) -> McpServer {
        McpServer {
            transport: McpTransport::Container {
                image: format!("ghcr.io/acme/{}:1", name),
                args: vec!["--stdio".to_string()],
                env: BTreeMap::from([("API_KEY".to_string(), "${{ secrets.KEY }}".to_string())]),
                network_allowed: Some(vec!["api.acme.dev".to_string()]),
            },
            allowed: Vec::new(),
        }
    }

    #[test]
    fn subnet_is_derived_from_name_hash() {
        let mut grants = ToolGrants::default();
        grants.servers.insert("fetch".to_string(), proxied("fetch"));
        let configs = plan(&grants).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].subnet_octet, subnet_seed("fetch"));
        assert_eq!(configs[0].subnet(), format!("172.28.{}.0/24", subnet_seed("fetch")));
    }

    #[test]
    fn colliding_seeds_probe_upward() {
        let seeds = vec![
            ("a".to_string(), 7),
            ("b".to_string(), 7),
            ("c".to_string(), 8),
            ("d".to_string(), 255),
            ("e".to_string(), 255),
        ];
        let allocated = allocate_subnets(&seeds).unwrap();
        let octets: Vec<u8> = allocated.iter().map(|(_, octet)| *octet).collect();
        assert_eq!(octets, vec![7, 8, 9, 255, 0]);
    }

    #[test]
    fn allocation_is_deterministic() {
        let mut grants = ToolGrants::default();
        grants.servers.insert("one".to_string(), proxied("one"));
        grants.servers.insert("two".to_string(), proxied("two"));
        assert_eq!(plan(&grants).unwrap(), plan(&grants).unwrap());
        let configs = plan(&grants).unwrap();
        assert_ne!(configs[0].subnet_octet, configs[1].subnet_octet);
    }

    #[test]
    fn compose_wires_tool_through_proxy() {
        let mut grants = ToolGrants::default();
        grants.servers.insert("fetch".to_string(), proxied("fetch"));
        let config = &plan(&grants).unwrap()[0];

        let compose: Value = serde_yaml::from_str(&docker_compose(config).unwrap()).unwrap();
        let tool = &compose["services"]["fetch"];
        assert_eq!(tool["image"].as_str(), Some("ghcr.io/acme/fetch:1"));
        let env: Vec<&str> = tool["environment"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(env.contains(&"HTTPS_PROXY=http://squid-proxy:3128"));
        assert!(env.contains(&"API_KEY"));
        assert_eq!(
            compose["networks"]["awproxy-fetch"]["ipam"]["config"][0]["subnet"].as_str(),
            Some(config.subnet().as_str())
        );

        assert!(squid_conf(config).contains(&format!("acl localnet src {}", config.subnet())));
        assert_eq!(allowed_domains(config), "api.acme.dev\n");
    }

    #[test]
    fn heredoc_terminates_content() {
        let delimiter = heredoc_delimiter("a");
        assert!(delimiter.starts_with("AWFLOW_EOF_"));
        assert_eq!(
            heredoc("/tmp/x", "a"),
            format!("cat > /tmp/x << '{0}'\na\n{0}\n", delimiter)
        );
    }

    #[test]
    fn heredoc_delimiter_never_occurs_in_content() {
        let delimiter = heredoc_delimiter("Line one\n");
        let hostile = format!("Line one\nAWFLOW_EOF\n{}\necho pwned\n", delimiter);
        let chosen = heredoc_delimiter(&hostile);
        assert!(hostile.lines().all(|line| line != chosen));

        let script = heredoc("/tmp/x", &hostile);
        let terminators = script.lines().filter(|line| *line == chosen).count();
        assert_eq!(terminators, 1);
        assert!(script.ends_with(&format!("echo pwned\n{}\n", chosen)));
    }
}
