//! Stateful fake of the Vault HTTP API.
//!
//! [`FakeVault`] implements wiremock's [`Respond`], so a single catch-all
//! mock serves every endpoint the client touches. State lives behind a
//! mutex: mounts, policies, approles, PKI issuers, transit keys and raft
//! peers all change as requests arrive, the way a real server would.
//!
//! Only behaviour the client depends on is modelled. Error bodies carry the
//! same messages Vault sends where the client matches on them.

use crate::fixtures::{
    INTERMEDIATE_CSR_PEM, LEAF_CERTIFICATE_PEM, SNAPSHOT_BYTES, errors_body, health_body,
    seal_status_body,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const TOKEN_HEADER: &str = "x-vault-token";
const ROOT_TOKEN: &str = "hvs.fake-root-token";

#[derive(Debug, Clone)]
struct RaftPeer {
    node_id: String,
    address: String,
    leader: bool,
}

#[derive(Debug)]
struct AppRole {
    role_id: String,
    policies: Vec<String>,
    secret_ids: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct PkiMount {
    ca_pem: Option<String>,
    roles: BTreeMap<String, Vec<String>>,
    issuers: Vec<String>,
    issuers_config: Option<Value>,
}

#[derive(Debug)]
struct State {
    tokens: HashMap<String, Vec<String>>,
    health: u16,
    seal_type: String,
    sealed: bool,
    migration: bool,
    audit_devices: BTreeMap<String, String>,
    auth_methods: BTreeSet<String>,
    mounts: BTreeMap<String, String>,
    mount_creations: usize,
    policies: BTreeMap<String, String>,
    approles: BTreeMap<String, AppRole>,
    pki: HashMap<String, PkiMount>,
    transit: HashMap<String, BTreeSet<String>>,
    transit_deletions: usize,
    raft_peers: Vec<RaftPeer>,
    raft_healthy: bool,
    snapshot: Vec<u8>,
    snapshot_restores: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            tokens: HashMap::from([(ROOT_TOKEN.to_string(), vec!["root".to_string()])]),
            health: 200,
            seal_type: "shamir".to_string(),
            sealed: false,
            migration: false,
            audit_devices: BTreeMap::new(),
            auth_methods: BTreeSet::from(["token".to_string()]),
            mounts: BTreeMap::new(),
            mount_creations: 0,
            policies: BTreeMap::new(),
            approles: BTreeMap::new(),
            pki: HashMap::new(),
            transit: HashMap::new(),
            transit_deletions: 0,
            raft_peers: vec![RaftPeer {
                node_id: "vault-0".to_string(),
                address: "vault-0.vault-endpoints:8201".to_string(),
                leader: true,
            }],
            raft_healthy: true,
            snapshot: SNAPSHOT_BYTES.to_vec(),
            snapshot_restores: 0,
        }
    }
}

/// A fake Vault server, shared between the test and the mock server.
#[derive(Debug, Clone, Default)]
pub struct FakeVault {
    state: Arc<Mutex<State>>,
}

impl FakeVault {
    /// Create a fake holding a root token and a single-node raft cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a mock server answering every request from this fake.
    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    /// Token accepted for every authenticated endpoint.
    #[must_use]
    pub fn root_token(&self) -> String {
        ROOT_TOKEN.to_string()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status code `sys/health` answers with.
    pub fn set_health(&self, status: u16) {
        self.lock().health = status;
    }

    /// Set what `sys/seal-status` reports.
    pub fn set_seal(&self, seal_type: &str, sealed: bool, migration: bool) {
        let mut state = self.lock();
        state.seal_type = seal_type.to_string();
        state.sealed = sealed;
        state.migration = migration;
    }

    /// Set whether autopilot reports the cluster healthy.
    pub fn set_raft_healthy(&self, healthy: bool) {
        self.lock().raft_healthy = healthy;
    }

    /// Add a non-leader voter to the raft configuration.
    pub fn add_raft_peer(&self, node_id: &str) {
        self.lock().raft_peers.push(RaftPeer {
            node_id: node_id.to_string(),
            address: format!("{node_id}.vault-endpoints:8201"),
            leader: false,
        });
    }

    /// Remove every raft peer.
    pub fn clear_raft_peers(&self) {
        self.lock().raft_peers.clear();
    }

    /// Node ids in the raft configuration.
    #[must_use]
    pub fn raft_peer_ids(&self) -> Vec<String> {
        self.lock()
            .raft_peers
            .iter()
            .map(|peer| peer.node_id.clone())
            .collect()
    }

    /// Number of secrets engines mounted so far, remounts included.
    #[must_use]
    pub fn mount_creations(&self) -> usize {
        self.lock().mount_creations
    }

    /// Whether a secrets engine is mounted at `path`.
    #[must_use]
    pub fn is_mounted(&self, path: &str) -> bool {
        self.lock().mounts.contains_key(path)
    }

    /// Number of enabled audit devices.
    #[must_use]
    pub fn audit_device_count(&self) -> usize {
        self.lock().audit_devices.len()
    }

    /// Whether an auth method is enabled at `path`.
    #[must_use]
    pub fn auth_method_enabled(&self, path: &str) -> bool {
        self.lock().auth_methods.contains(path)
    }

    /// Stored text of a policy.
    #[must_use]
    pub fn policy(&self, name: &str) -> Option<String> {
        self.lock().policies.get(name).cloned()
    }

    /// Whether an `AppRole` role exists.
    #[must_use]
    pub fn approle_exists(&self, name: &str) -> bool {
        self.lock().approles.contains_key(name)
    }

    /// Policies attached to an `AppRole` role's tokens.
    #[must_use]
    pub fn approle_policies(&self, name: &str) -> Option<Vec<String>> {
        self.lock()
            .approles
            .get(name)
            .map(|role| role.policies.clone())
    }

    /// Transit key names on a mount.
    #[must_use]
    pub fn transit_keys(&self, mount: &str) -> Vec<String> {
        self.lock()
            .transit
            .get(mount)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of transit keys deleted so far.
    #[must_use]
    pub fn transit_key_deletions(&self) -> usize {
        self.lock().transit_deletions
    }

    /// Issuer ids on a PKI mount, oldest first.
    #[must_use]
    pub fn issuers(&self, mount: &str) -> Vec<String> {
        self.lock()
            .pki
            .get(mount)
            .map(|pki| pki.issuers.clone())
            .unwrap_or_default()
    }

    /// Current issuers config of a PKI mount.
    #[must_use]
    pub fn issuers_config(&self, mount: &str) -> Option<Value> {
        self.lock()
            .pki
            .get(mount)
            .and_then(|pki| pki.issuers_config.clone())
    }

    /// Replace the issuers config of a PKI mount; `None` makes reads empty.
    pub fn set_issuers_config(&self, mount: &str, config: Option<Value>) {
        self.lock()
            .pki
            .entry(mount.to_string())
            .or_default()
            .issuers_config = config;
    }

    /// Bytes currently served as the raft snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().snapshot.clone()
    }

    /// Number of forced snapshot restores.
    #[must_use]
    pub fn snapshot_restores(&self) -> usize {
        self.lock().snapshot_restores
    }
}

impl Respond for FakeVault {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Some(path) = request.url.path().strip_prefix("/v1/") else {
            return error(404, &[]);
        };
        let query = |key: &str| {
            request
                .url
                .query_pairs()
                .any(|(k, v)| k == key && v == "true")
        };
        let method = if query("list") {
            "LIST"
        } else {
            request.method.as_str()
        };
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);

        let mut state = self.lock();
        match (method, path) {
            ("GET", "sys/health") => return state.health(query("standbyok")),
            ("GET", "sys/init") => return ok(json!({ "initialized": true })),
            ("GET", "sys/seal-status") => {
                return ok(seal_status_body(&state.seal_type, state.sealed, state.migration));
            }
            ("POST", "auth/approle/login") => return state.approle_login(&body),
            _ => {}
        }

        let authorized = request
            .headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|token| state.tokens.get(token).cloned().map(|policies| (token, policies)));
        let Some((token, policies)) = authorized else {
            return error(403, &["permission denied"]);
        };

        if let Some(rest) = path.strip_prefix("sys/") {
            return state.sys(method, rest, &body, &request.body);
        }
        if path == "auth/token/lookup-self" && method == "GET" {
            return lookup_self(token, &policies);
        }
        if let Some(rest) = path.strip_prefix("auth/approle/") {
            if !state.auth_methods.contains("approle") {
                return no_handler(path);
            }
            return state.approle(method, rest, &body);
        }
        state.mounted(method, path, &body)
    }
}

impl State {
    fn health(&self, standby_ok: bool) -> ResponseTemplate {
        let status = if standby_ok && self.health == 429 {
            200
        } else {
            self.health
        };
        ResponseTemplate::new(status).set_body_json(health_body(self.health == 429))
    }

    fn sys(&mut self, method: &str, path: &str, body: &Value, raw: &[u8]) -> ResponseTemplate {
        match (method, path) {
            ("GET", "mounts") => {
                let listing: serde_json::Map<String, Value> = self
                    .mounts
                    .iter()
                    .map(|(path, kind)| (format!("{path}/"), json!({ "type": kind })))
                    .collect();
                return ok(json!({ "data": listing }));
            }
            ("GET", "storage/raft/configuration") => {
                let servers: Vec<Value> = self
                    .raft_peers
                    .iter()
                    .map(|peer| {
                        json!({
                            "node_id": peer.node_id,
                            "address": peer.address,
                            "leader": peer.leader,
                            "voter": true,
                            "protocol_version": "3",
                        })
                    })
                    .collect();
                return ok(json!({ "data": { "config": { "index": 0, "servers": servers } } }));
            }
            ("GET", "storage/raft/autopilot/state") => return self.autopilot_state(),
            ("POST", "storage/raft/remove-peer") => {
                let server_id = body["server_id"].as_str().unwrap_or_default();
                self.raft_peers.retain(|peer| peer.node_id != server_id);
                return no_content();
            }
            ("GET", "storage/raft/snapshot") => {
                return ResponseTemplate::new(200)
                    .set_body_raw(self.snapshot.clone(), "application/octet-stream");
            }
            ("POST", "storage/raft/snapshot-force") => {
                self.snapshot = raw.to_vec();
                self.snapshot_restores += 1;
                return no_content();
            }
            _ => {}
        }

        if let Some(device) = path.strip_prefix("audit/") {
            if method != "POST" {
                return no_handler(path);
            }
            if self.audit_devices.contains_key(device) {
                return error(400, &["path already in use"]);
            }
            let file_path = body["options"]["file_path"].as_str().unwrap_or_default();
            self.audit_devices
                .insert(device.to_string(), file_path.to_string());
            return no_content();
        }
        if let Some(auth) = path.strip_prefix("auth/") {
            if method != "POST" {
                return no_handler(path);
            }
            if !self.auth_methods.insert(auth.to_string()) {
                return error_message(400, format!("path is already in use at {auth}/"));
            }
            return no_content();
        }
        if let Some(mount) = path.strip_prefix("mounts/") {
            return self.mount(method, mount, body);
        }
        if let Some(name) = path.strip_prefix("policy/") {
            return match method {
                "PUT" | "POST" => {
                    let policy = body["policy"].as_str().unwrap_or_default();
                    self.policies.insert(name.to_string(), policy.to_string());
                    no_content()
                }
                "DELETE" => {
                    self.policies.remove(name);
                    no_content()
                }
                "GET" => match self.policies.get(name) {
                    Some(rules) => ok(json!({ "data": { "name": name, "rules": rules } })),
                    None => error(404, &[]),
                },
                _ => no_handler(path),
            };
        }
        no_handler(path)
    }

    fn mount(&mut self, method: &str, mount: &str, body: &Value) -> ResponseTemplate {
        match method {
            "POST" => {
                if self.mounts.contains_key(mount) {
                    return error_message(400, format!("path is already in use at {mount}/"));
                }
                let kind = body["type"].as_str().unwrap_or("kv").to_string();
                match kind.as_str() {
                    "pki" => {
                        self.pki.entry(mount.to_string()).or_default();
                    }
                    "transit" => {
                        self.transit.entry(mount.to_string()).or_default();
                    }
                    _ => {}
                }
                self.mounts.insert(mount.to_string(), kind);
                self.mount_creations += 1;
                no_content()
            }
            "DELETE" => {
                self.mounts.remove(mount);
                self.pki.remove(mount);
                self.transit.remove(mount);
                no_content()
            }
            _ => no_handler(mount),
        }
    }

    fn autopilot_state(&self) -> ResponseTemplate {
        let leader = self
            .raft_peers
            .iter()
            .find(|peer| peer.leader)
            .map(|peer| peer.node_id.clone())
            .unwrap_or_default();
        let voters: Vec<&str> = self
            .raft_peers
            .iter()
            .map(|peer| peer.node_id.as_str())
            .collect();
        let servers: serde_json::Map<String, Value> = self
            .raft_peers
            .iter()
            .map(|peer| {
                let status = if peer.leader { "leader" } else { "voter" };
                (
                    peer.node_id.clone(),
                    json!({
                        "id": peer.node_id,
                        "name": peer.node_id,
                        "address": peer.address,
                        "node_status": "alive",
                        "healthy": self.raft_healthy,
                        "status": status,
                        "version": "1.17.2",
                    }),
                )
            })
            .collect();
        ok(json!({
            "data": {
                "healthy": self.raft_healthy,
                "failure_tolerance": voters.len().saturating_sub(1) / 2,
                "leader": leader,
                "voters": voters,
                "servers": servers,
            }
        }))
    }

    fn approle_login(&mut self, body: &Value) -> ResponseTemplate {
        if !self.auth_methods.contains("approle") {
            return no_handler("auth/approle/login");
        }
        let role_id = body["role_id"].as_str().unwrap_or_default();
        let secret_id = body["secret_id"].as_str().unwrap_or_default();
        let role = self
            .approles
            .values()
            .find(|role| role.role_id == role_id && role.secret_ids.contains_key(secret_id));
        let Some(role) = role else {
            return error(400, &["invalid role or secret ID"]);
        };

        let token = format!("hvs.fake-{}", uuid::Uuid::new_v4());
        let policies = role.policies.clone();
        self.tokens.insert(token.clone(), policies.clone());
        ok(json!({
            "auth": {
                "client_token": token,
                "accessor": uuid::Uuid::new_v4().to_string(),
                "policies": policies,
                "lease_duration": 3600,
                "renewable": true,
            }
        }))
    }

    fn approle(&mut self, method: &str, path: &str, body: &Value) -> ResponseTemplate {
        let Some(rest) = path.strip_prefix("role/") else {
            return no_handler(path);
        };
        let (name, action) = rest.split_once('/').unwrap_or((rest, ""));

        match (method, action) {
            ("POST", "") => {
                let policies = string_list(&body["token_policies"]);
                self.approles
                    .entry(name.to_string())
                    .and_modify(|role| role.policies.clone_from(&policies))
                    .or_insert_with(|| AppRole {
                        role_id: uuid::Uuid::new_v4().to_string(),
                        policies,
                        secret_ids: HashMap::new(),
                    });
                no_content()
            }
            ("DELETE", "") => {
                self.approles.remove(name);
                no_content()
            }
            ("GET", "role-id") => match self.approles.get(name) {
                Some(role) => ok(json!({ "data": { "role_id": role.role_id } })),
                None => error(404, &[]),
            },
            ("POST", "secret-id") => {
                let Some(role) = self.approles.get_mut(name) else {
                    return error_message(400, format!("role \"{name}\" does not exist"));
                };
                let secret_id = uuid::Uuid::new_v4().to_string();
                role.secret_ids
                    .insert(secret_id.clone(), string_list(&body["cidr_list"]));
                ok(json!({
                    "data": {
                        "secret_id": secret_id,
                        "secret_id_accessor": accessor_of(&secret_id),
                        "secret_id_num_uses": 0,
                        "secret_id_ttl": 0,
                    }
                }))
            }
            ("POST", "secret-id/lookup") => {
                let secret_id = body["secret_id"].as_str().unwrap_or_default();
                let cidrs = self
                    .approles
                    .get(name)
                    .and_then(|role| role.secret_ids.get(secret_id));
                match cidrs {
                    Some(cidrs) => ok(json!({
                        "data": {
                            "secret_id_accessor": accessor_of(secret_id),
                            "cidr_list": cidrs,
                            "token_bound_cidrs": [],
                            "metadata": {},
                            "secret_id_num_uses": 0,
                            "secret_id_ttl": 0,
                            "creation_time": "2026-01-01T00:00:00Z",
                        }
                    })),
                    // Vault answers an unknown secret id with an empty 204.
                    None => no_content(),
                }
            }
            _ => no_handler(path),
        }
    }

    fn mounted(&mut self, method: &str, path: &str, body: &Value) -> ResponseTemplate {
        let mount = self
            .mounts
            .keys()
            .filter(|mount| path.starts_with(&format!("{mount}/")))
            .max_by_key(|mount| mount.len())
            .cloned();
        let Some(mount) = mount else {
            return no_handler(path);
        };
        let rest = &path[mount.len() + 1..];

        if let Some(pki) = self.pki.get_mut(&mount) {
            return pki.respond(method, rest, body);
        }
        if self.transit.contains_key(&mount) {
            return self.transit(&mount, method, rest);
        }
        no_handler(path)
    }

    fn transit(&mut self, mount: &str, method: &str, path: &str) -> ResponseTemplate {
        let Some(name) = path.strip_prefix("keys/") else {
            return error(404, &["unsupported path"]);
        };
        let keys = self.transit.entry(mount.to_string()).or_default();
        match method {
            "POST" => {
                keys.insert(name.to_string());
                no_content()
            }
            "GET" if keys.contains(name) => ok(json!({
                "data": {
                    "name": name,
                    "type": "aes256-gcm96",
                    "deletion_allowed": false,
                    "latest_version": 1,
                }
            })),
            "GET" => error(404, &[]),
            "DELETE" => {
                if keys.remove(name) {
                    self.transit_deletions += 1;
                }
                no_content()
            }
            _ => error(405, &[]),
        }
    }
}

impl PkiMount {
    fn respond(&mut self, method: &str, path: &str, body: &Value) -> ResponseTemplate {
        match (method, path) {
            ("POST", "intermediate/generate/internal") => {
                let key_id = uuid::Uuid::new_v4().to_string();
                return ok(json!({ "data": { "csr": INTERMEDIATE_CSR_PEM, "key_id": key_id } }));
            }
            ("POST", "intermediate/set-signed") => {
                let certificate = body["certificate"].as_str().unwrap_or_default();
                let issuer = uuid::Uuid::new_v4().to_string();
                self.ca_pem = Some(certificate.to_string());
                self.issuers.push(issuer.clone());
                if self.issuers_config.is_none() {
                    self.issuers_config = Some(json!({
                        "default": issuer,
                        "default_follows_latest_issuer": false,
                    }));
                }
                return ok(json!({ "data": { "imported_issuers": [issuer], "mapping": {} } }));
            }
            ("GET", "ca/pem") => {
                let pem = self.ca_pem.clone().unwrap_or_default();
                return ResponseTemplate::new(200).set_body_string(pem);
            }
            ("LIST", "issuers") => {
                if self.issuers.is_empty() {
                    return error(404, &[]);
                }
                return ok(json!({ "data": { "keys": self.issuers } }));
            }
            ("GET", "config/issuers") => {
                return match &self.issuers_config {
                    Some(config) => ok(json!({ "data": config })),
                    None => no_content(),
                };
            }
            ("POST", "config/issuers") => {
                let mut config = self.issuers_config.clone().unwrap_or_else(|| json!({}));
                if let (Some(config), Some(update)) = (config.as_object_mut(), body.as_object()) {
                    config.extend(update.clone());
                }
                self.issuers_config = Some(config.clone());
                return ok(json!({ "data": config }));
            }
            ("LIST", "roles") => {
                if self.roles.is_empty() {
                    return error(404, &[]);
                }
                let keys: Vec<&String> = self.roles.keys().collect();
                return ok(json!({ "data": { "keys": keys } }));
            }
            _ => {}
        }

        if let Some(role) = path.strip_prefix("roles/") {
            return match method {
                "POST" => {
                    self.roles
                        .insert(role.to_string(), string_list(&body["allowed_domains"]));
                    no_content()
                }
                "GET" => match self.roles.get(role) {
                    Some(domains) => ok(json!({
                        "data": {
                            "allowed_domains": domains,
                            "allow_subdomains": true,
                            "max_ttl": 0,
                        }
                    })),
                    None => error(404, &[]),
                },
                _ => error(405, &[]),
            };
        }
        if let Some(role) = path.strip_prefix("sign/") {
            if method != "POST" {
                return error(405, &[]);
            }
            return self.sign(role, body);
        }
        error(404, &["unsupported path"])
    }

    fn sign(&self, role: &str, body: &Value) -> ResponseTemplate {
        let Some(domains) = self.roles.get(role) else {
            return error_message(400, format!("unknown role: {role}"));
        };
        let Some(ca) = &self.ca_pem else {
            return error(400, &["no default issuer currently configured"]);
        };
        let common_name = body["common_name"].as_str().unwrap_or_default();
        let allowed = domains
            .iter()
            .any(|domain| common_name == domain || common_name.ends_with(&format!(".{domain}")));
        if !allowed {
            let message = format!("common name {common_name} not allowed by this role");
            return error_message(400, message);
        }
        ok(json!({
            "data": {
                "certificate": LEAF_CERTIFICATE_PEM,
                "issuing_ca": ca,
                "ca_chain": [ca],
                "serial_number": "7a:11:00:00:00:00:00:01",
            }
        }))
    }
}

fn lookup_self(token: &str, policies: &[String]) -> ResponseTemplate {
    let root = policies.iter().any(|policy| policy == "root");
    let (display_name, ttl) = if root { ("root", 0) } else { ("approle", 3600) };
    ok(json!({
        "data": {
            "accessor": accessor_of(token),
            "display_name": display_name,
            "policies": policies,
            "ttl": ttl,
            "expire_time": Value::Null,
            "renewable": !root,
            "type": "service",
            "id": token,
        }
    }))
}

fn accessor_of(secret: &str) -> String {
    format!("accessor-{}", secret.len())
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn no_content() -> ResponseTemplate {
    ResponseTemplate::new(204)
}

fn error(status: u16, errors: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(errors_body(errors))
}

fn error_message(status: u16, message: String) -> ResponseTemplate {
    error(status, &[message.as_str()])
}

fn no_handler(path: &str) -> ResponseTemplate {
    error_message(404, format!("no handler for route \"{path}\""))
}
