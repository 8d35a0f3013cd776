//! Named limiter policies.
//!
//! A policy pairs a [`LimitRule`] with a store and a key-derivation rule. Five
//! policies exist, each with its own defaults:
//!
//! | Policy              | Store           | Key                                  | Max | Window |
//! |---------------------|-----------------|--------------------------------------|-----|--------|
//! | General             | general         | `<ip>`                               | 500 | 15 min |
//! | Heavy operation     | heavy operation | `heavy_<ip>` / `heavy_<op>_<ip>`     | 25  | 60 min |
//! | DB-intensive        | general         | `db_<ip>`                            | 100 | 10 min |
//! | Excel by IP         | heavy operation | `excel_ip_<ip>`                      | 50  | 60 min |
//! | Excel by user       | heavy operation | `excel_user_<id>` or `excel_ip_<ip>` | 30  | 60 min |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::counter::Decision;
use super::identity::ClientIdentity;
use super::registry::{RateLimitRegistry, StoreKind};
use crate::config::{LimitOverride, PoliciesConfig};
use crate::error::{FieldguardError, Result};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

const EXCEL_SUGGESTION: &str = "Espere a que termine la ventana actual o reduzca el rango de \
fechas del reporte antes de volver a descargar.";

/// The five limiter flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Generic request throttling per client address
    General,
    /// Bulk exports and other expensive operations
    HeavyOperation,
    /// Endpoints that run expensive queries
    DatabaseIntensive,
    /// Excel report downloads per client address
    ExcelByIp,
    /// Excel report downloads per authenticated user
    ExcelByUser,
}

impl PolicyKind {
    /// Every policy, in declaration order.
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::General,
        PolicyKind::HeavyOperation,
        PolicyKind::DatabaseIntensive,
        PolicyKind::ExcelByIp,
        PolicyKind::ExcelByUser,
    ];

    /// The store this policy counts against.
    pub fn store(&self) -> StoreKind {
        match self {
            PolicyKind::General | PolicyKind::DatabaseIntensive => StoreKind::General,
            PolicyKind::HeavyOperation | PolicyKind::ExcelByIp | PolicyKind::ExcelByUser => {
                StoreKind::HeavyOperation
            }
        }
    }

    /// Machine-readable tag carried by rejections. General has none.
    pub fn type_tag(&self) -> Option<&'static str> {
        match self {
            PolicyKind::General => None,
            PolicyKind::HeavyOperation => Some("heavy_operation_limit"),
            PolicyKind::DatabaseIntensive => Some("database_intensive_limit"),
            PolicyKind::ExcelByIp => Some("excel_download_limit_by_ip"),
            PolicyKind::ExcelByUser => Some("excel_download_limit_by_user"),
        }
    }

    /// Out-of-the-box threshold and window.
    pub fn default_rule(&self) -> LimitRule {
        let (max_requests, window_secs) = match self {
            PolicyKind::General => (500, 15 * MINUTE),
            PolicyKind::HeavyOperation => (25, HOUR),
            PolicyKind::DatabaseIntensive => (100, 10 * MINUTE),
            PolicyKind::ExcelByIp => (50, HOUR),
            PolicyKind::ExcelByUser => (30, HOUR),
        };
        LimitRule {
            max_requests,
            window: Duration::from_secs(window_secs),
            window_ms: window_secs * 1000,
        }
    }

    fn is_excel(&self) -> bool {
        matches!(self, PolicyKind::ExcelByIp | PolicyKind::ExcelByUser)
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PolicyKind::General => "general",
            PolicyKind::HeavyOperation => "heavy_operation",
            PolicyKind::DatabaseIntensive => "database_intensive",
            PolicyKind::ExcelByIp => "excel_by_ip",
            PolicyKind::ExcelByUser => "excel_by_user",
        };
        f.write_str(name)
    }
}

/// A threshold over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitRule {
    max_requests: u32,
    window: Duration,
    window_ms: u64,
}

impl LimitRule {
    /// Create a rule admitting `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(FieldguardError::InvalidLimit(
                "max_requests must be at least 1".to_string(),
            ));
        }
        let window_ms = u64::try_from(window.as_millis()).map_err(|_| {
            FieldguardError::InvalidLimit(format!("window of {:?} is too long", window))
        })?;
        if window_ms == 0 {
            return Err(FieldguardError::InvalidLimit(
                "window must be at least one millisecond".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
            window_ms,
        })
    }

    /// Requests admitted per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Apply a partial override, keeping unset fields.
    pub fn overridden(&self, with: &LimitOverride) -> Result<Self> {
        Self::new(
            with.max_requests.unwrap_or(self.max_requests),
            with.window_secs
                .map(Duration::from_secs)
                .unwrap_or(self.window),
        )
    }
}

/// Body sent back with a 429.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// Always `false`
    pub success: bool,
    /// Human-readable explanation embedding the threshold and window
    pub message: String,
    /// Seconds until the window resets
    pub retry_after: u64,
    /// Policy tag, absent for the general policy
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<String>,
    /// Who was limited (Excel policies only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub identifier: Option<String>,
    /// Usage guidance (Excel policies only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggestion: Option<String>,
}

/// What a policy decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Forward the request.
    Proceed {
        /// Requests still admissible in the current window
        remaining: u32,
    },
    /// Answer with a 429 and this body.
    Reject(Rejection),
}

/// The store key and diagnostic label a policy derived for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// Store key
    pub key: String,
    /// Human-readable label, e.g. `Usuario: 42`
    pub identifier: String,
}

/// A configured limiter: policy kind plus its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    kind: PolicyKind,
    rule: LimitRule,
}

impl Policy {
    /// A policy of `kind` with its default rule.
    pub fn new(kind: PolicyKind) -> Self {
        Self {
            kind,
            rule: kind.default_rule(),
        }
    }

    /// 500 requests per 15 minutes per address.
    pub fn general() -> Self {
        Self::new(PolicyKind::General)
    }

    /// 25 heavy operations per hour per address.
    pub fn heavy_operation() -> Self {
        Self::new(PolicyKind::HeavyOperation)
    }

    /// 100 expensive queries per 10 minutes per address.
    pub fn database_intensive() -> Self {
        Self::new(PolicyKind::DatabaseIntensive)
    }

    /// 50 Excel downloads per hour per address.
    pub fn excel_by_ip() -> Self {
        Self::new(PolicyKind::ExcelByIp)
    }

    /// 30 Excel downloads per hour per user.
    pub fn excel_by_user() -> Self {
        Self::new(PolicyKind::ExcelByUser)
    }

    /// Replace the default rule.
    pub fn with_rule(mut self, rule: LimitRule) -> Self {
        self.rule = rule;
        self
    }

    /// Which policy this is.
    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// The threshold and window in force.
    pub fn rule(&self) -> &LimitRule {
        &self.rule
    }

    /// Derive the store key for `identity`.
    pub fn derive_key(&self, identity: &ClientIdentity) -> DerivedKey {
        let ip = identity.ip();
        let by_ip = |key: String| DerivedKey {
            key,
            identifier: identity.ip_label(),
        };

        match self.kind {
            PolicyKind::General => by_ip(ip.to_string()),
            PolicyKind::HeavyOperation => match identity.operation() {
                Some(operation) => by_ip(format!("heavy_{}_{}", operation, ip)),
                None => by_ip(format!("heavy_{}", ip)),
            },
            PolicyKind::DatabaseIntensive => by_ip(format!("db_{}", ip)),
            PolicyKind::ExcelByIp => by_ip(format!("excel_ip_{}", ip)),
            PolicyKind::ExcelByUser => match identity.principal() {
                Some(principal) => DerivedKey {
                    key: format!("excel_user_{}", principal),
                    identifier: format!("Usuario: {}", principal),
                },
                None => by_ip(format!("excel_ip_{}", ip)),
            },
        }
    }

    /// Count the request and decide.
    pub fn evaluate(&self, registry: &RateLimitRegistry, identity: &ClientIdentity) -> PolicyOutcome {
        let derived = self.derive_key(identity);
        let decision = registry.check_labeled(
            self.kind.store(),
            &derived.key,
            &self.rule,
            Some(&derived.identifier),
        );

        match decision {
            Decision::Allow { remaining, .. } => PolicyOutcome::Proceed { remaining },
            Decision::Deny {
                retry_after_secs, ..
            } => {
                debug!(
                    policy = %self.kind,
                    key = %derived.key,
                    limit = self.rule.max_requests,
                    retry_after = retry_after_secs,
                    "Rate limit exceeded"
                );
                PolicyOutcome::Reject(self.rejection(retry_after_secs, derived.identifier))
            }
        }
    }

    /// Framework-neutral middleware: call exactly one of `proceed` or `respond`.
    pub fn guard<T>(
        &self,
        registry: &RateLimitRegistry,
        identity: &ClientIdentity,
        proceed: impl FnOnce() -> T,
        respond: impl FnOnce(Rejection) -> T,
    ) -> T {
        match self.evaluate(registry, identity) {
            PolicyOutcome::Proceed { .. } => proceed(),
            PolicyOutcome::Reject(rejection) => respond(rejection),
        }
    }

    fn rejection(&self, retry_after: u64, identifier: String) -> Rejection {
        let max = self.rule.max_requests;
        let window = describe_window(self.rule.window);

        let message = match self.kind {
            PolicyKind::General => format!(
                "Demasiadas solicitudes desde esta IP. Máximo {} solicitudes cada {}. \
                 Intente de nuevo más tarde.",
                max, window
            ),
            PolicyKind::HeavyOperation => format!(
                "Demasiadas operaciones pesadas. Máximo {} operaciones cada {}. \
                 Intente de nuevo más tarde.",
                max, window
            ),
            PolicyKind::DatabaseIntensive => format!(
                "Demasiadas consultas a la base de datos. Máximo {} consultas cada {}.",
                max, window
            ),
            PolicyKind::ExcelByIp => format!(
                "Límite de descargas de Excel alcanzado para esta IP. Máximo {} descargas cada {}.",
                max, window
            ),
            PolicyKind::ExcelByUser => format!(
                "Límite de descargas de Excel alcanzado para este usuario. Máximo {} descargas cada {}.",
                max, window
            ),
        };

        let excel = self.kind.is_excel();
        Rejection {
            success: false,
            message,
            retry_after,
            kind: self.kind.type_tag().map(str::to_string),
            identifier: excel.then_some(identifier),
            suggestion: excel.then(|| EXCEL_SUGGESTION.to_string()),
        }
    }
}

/// Spanish rendering of a window length, e.g. `15 minutos` or `1 hora`.
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let plural = |n: u64, one: &str, many: &str| {
        if n == 1 {
            format!("1 {}", one)
        } else {
            format!("{} {}", n, many)
        }
    };

    if window.subsec_millis() != 0 || secs == 0 {
        return format!("{} ms", window.as_millis());
    }
    if secs % HOUR == 0 {
        plural(secs / HOUR, "hora", "horas")
    } else if secs % MINUTE == 0 {
        plural(secs / MINUTE, "minuto", "minutos")
    } else {
        plural(secs, "segundo", "segundos")
    }
}

/// One configured instance of every policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    general: Policy,
    heavy_operation: Policy,
    database_intensive: Policy,
    excel_by_ip: Policy,
    excel_by_user: Policy,
}

impl PolicySet {
    /// Apply configured overrides on top of the defaults.
    pub fn from_config(config: &PoliciesConfig) -> Result<Self> {
        let build = |kind: PolicyKind, with: &Option<LimitOverride>| -> Result<Policy> {
            let policy = Policy::new(kind);
            match with {
                Some(with) => Ok(policy.with_rule(policy.rule().overridden(with)?)),
                None => Ok(policy),
            }
        };

        Ok(Self {
            general: build(PolicyKind::General, &config.general)?,
            heavy_operation: build(PolicyKind::HeavyOperation, &config.heavy_operation)?,
            database_intensive: build(PolicyKind::DatabaseIntensive, &config.database_intensive)?,
            excel_by_ip: build(PolicyKind::ExcelByIp, &config.excel_by_ip)?,
            excel_by_user: build(PolicyKind::ExcelByUser, &config.excel_by_user)?,
        })
    }

    /// The configured policy of `kind`.
    pub fn get(&self, kind: PolicyKind) -> &Policy {
        match kind {
            PolicyKind::General => &self.general,
            PolicyKind::HeavyOperation => &self.heavy_operation,
            PolicyKind::DatabaseIntensive => &self.database_intensive,
            PolicyKind::ExcelByIp => &self.excel_by_ip,
            PolicyKind::ExcelByUser => &self.excel_by_user,
        }
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            general: Policy::general(),
            heavy_operation: Policy::heavy_operation(),
            database_intensive: Policy::database_intensive(),
            excel_by_ip: Policy::excel_by_ip(),
            excel_by_user: Policy::excel_by_user(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use crate::ratelimit::identity::AuthenticatedUser;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn registry() -> (Arc<ManualClock>, RateLimitRegistry) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let registry = RateLimitRegistry::with_clock(clock.clone());
        (clock, registry)
    }

    fn small(kind: PolicyKind, max: u32) -> Policy {
        Policy::new(kind).with_rule(LimitRule::new(max, Duration::from_secs(60)).unwrap())
    }

    fn reject(outcome: PolicyOutcome) -> Rejection {
        match outcome {
            PolicyOutcome::Reject(rejection) => rejection,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_default_rules() {
        let expect = [
            (PolicyKind::General, 500, 15 * 60),
            (PolicyKind::HeavyOperation, 25, 3600),
            (PolicyKind::DatabaseIntensive, 100, 10 * 60),
            (PolicyKind::ExcelByIp, 50, 3600),
            (PolicyKind::ExcelByUser, 30, 3600),
        ];
        for (kind, max, secs) in expect {
            let rule = kind.default_rule();
            assert_eq!(rule.max_requests(), max, "{}", kind);
            assert_eq!(rule.window(), Duration::from_secs(secs), "{}", kind);
        }
    }

    #[test]
    fn test_limit_rule_validation() {
        assert_err!(LimitRule::new(0, Duration::from_secs(1)));
        assert_err!(LimitRule::new(1, Duration::ZERO));
        assert_ok!(LimitRule::new(1, Duration::from_millis(1)));
    }

    #[test]
    fn test_limit_rule_rejects_window_beyond_millis_range() {
        assert_err!(LimitRule::new(1, Duration::from_secs(18_446_744_073_709_552)));
        assert_err!(LimitRule::new(1, Duration::MAX));

        let rule = LimitRule::new(1, Duration::from_secs(365 * 24 * 3600)).unwrap();
        assert_eq!(rule.window_ms(), 365 * 24 * 3600 * 1000);
    }

    #[test]
    fn test_limit_rule_override() {
        let base = PolicyKind::General.default_rule();
        let rule = base
            .overridden(&LimitOverride {
                max_requests: Some(10),
                window_secs: None,
            })
            .unwrap();
        assert_eq!(rule.max_requests(), 10);
        assert_eq!(rule.window(), base.window());

        assert_err!(base.overridden(&LimitOverride {
            max_requests: None,
            window_secs: Some(0),
        }));
    }

    #[test]
    fn test_key_derivation() {
        let anon = ClientIdentity::from_ip("1.2.3.4");
        let user = anon.clone().with_user(AuthenticatedUser::with_id("42"));
        let scoped = anon.clone().with_operation("bulk_export");

        assert_eq!(Policy::general().derive_key(&anon).key, "1.2.3.4");
        assert_eq!(Policy::heavy_operation().derive_key(&anon).key, "heavy_1.2.3.4");
        assert_eq!(
            Policy::heavy_operation().derive_key(&scoped).key,
            "heavy_bulk_export_1.2.3.4"
        );
        assert_eq!(Policy::database_intensive().derive_key(&anon).key, "db_1.2.3.4");
        assert_eq!(Policy::excel_by_ip().derive_key(&user).key, "excel_ip_1.2.3.4");

        let derived = Policy::excel_by_user().derive_key(&user);
        assert_eq!(derived.key, "excel_user_42");
        assert_eq!(derived.identifier, "Usuario: 42");

        let derived = Policy::excel_by_user().derive_key(&anon);
        assert_eq!(derived.key, "excel_ip_1.2.3.4");
        assert_eq!(derived.identifier, "IP: 1.2.3.4");

        let email = anon.with_user(AuthenticatedUser::with_email("m@example.com"));
        assert_eq!(
            Policy::excel_by_user().derive_key(&email).key,
            "excel_user_m@example.com"
        );
    }

    #[test]
    fn test_unknown_clients_share_a_bucket() {
        let (_, registry) = registry();
        let policy = small(PolicyKind::General, 1);

        assert!(matches!(
            policy.evaluate(&registry, &ClientIdentity::unknown()),
            PolicyOutcome::Proceed { .. }
        ));
        reject(policy.evaluate(&registry, &ClientIdentity::from_ip("")));
    }

    #[test]
    fn test_general_rejection_has_no_tag() {
        let (_, registry) = registry();
        let policy = small(PolicyKind::General, 1);
        let client = ClientIdentity::from_ip("1.2.3.4");

        policy.evaluate(&registry, &client);
        let rejection = reject(policy.evaluate(&registry, &client));

        assert!(!rejection.success);
        assert_eq!(rejection.retry_after, 60);
        assert_eq!(rejection.kind, None);
        assert_eq!(rejection.identifier, None);
        assert_eq!(rejection.suggestion, None);
        assert!(rejection.message.contains("Máximo 1 solicitudes cada 1 minuto"));

        let json = serde_json::to_value(&rejection).unwrap();
        assert!(json.get("type").is_none());
        assert_eq!(json["retryAfter"], 60);
        assert_eq!(json["success"], false);
    }

    #[test]
    fn test_tagged_rejections() {
        let (_, registry) = registry();
        let client = ClientIdentity::from_ip("9.9.9.9");

        for kind in [
            PolicyKind::HeavyOperation,
            PolicyKind::DatabaseIntensive,
            PolicyKind::ExcelByIp,
            PolicyKind::ExcelByUser,
        ] {
            registry.clear();
            let policy = small(kind, 1);
            policy.evaluate(&registry, &client);
            let rejection = reject(policy.evaluate(&registry, &client));

            assert_eq!(rejection.kind.as_deref(), kind.type_tag());
            assert_eq!(rejection.identifier.is_some(), kind.is_excel());
            assert_eq!(rejection.suggestion.is_some(), kind.is_excel());
        }
    }

    #[test]
    fn test_excel_by_user_echoes_user() {
        let (_, registry) = registry();
        let policy = small(PolicyKind::ExcelByUser, 1);
        let client = ClientIdentity::from_ip("1.2.3.4").with_user(AuthenticatedUser::with_id("42"));

        policy.evaluate(&registry, &client);
        let rejection = reject(policy.evaluate(&registry, &client));
        assert_eq!(rejection.identifier.as_deref(), Some("Usuario: 42"));
        assert_eq!(
            rejection.kind.as_deref(),
            Some("excel_download_limit_by_user")
        );
    }

    #[test]
    fn test_general_and_heavy_quotas_are_separate() {
        let (_, registry) = registry();
        let general = small(PolicyKind::General, 2);
        let heavy = small(PolicyKind::HeavyOperation, 2);
        let client = ClientIdentity::from_ip("1.2.3.4");

        general.evaluate(&registry, &client);
        general.evaluate(&registry, &client);
        reject(general.evaluate(&registry, &client));

        assert_eq!(
            heavy.evaluate(&registry, &client),
            PolicyOutcome::Proceed { remaining: 1 }
        );
    }

    #[test]
    fn test_excel_user_fallback_shares_key_but_not_threshold() {
        let (_, registry) = registry();
        let by_user = small(PolicyKind::ExcelByUser, 3);
        let by_ip = small(PolicyKind::ExcelByIp, 5);
        let anon = ClientIdentity::from_ip("1.2.3.4");

        assert_eq!(
            by_user.derive_key(&anon).key,
            by_ip.derive_key(&anon).key
        );

        for _ in 0..3 {
            assert!(matches!(
                by_user.evaluate(&registry, &anon),
                PolicyOutcome::Proceed { .. }
            ));
        }
        reject(by_user.evaluate(&registry, &anon));

        // The by-IP policy still has room under its own, higher threshold
        assert_eq!(
            by_ip.evaluate(&registry, &anon),
            PolicyOutcome::Proceed { remaining: 1 }
        );
        assert_eq!(
            by_ip.evaluate(&registry, &anon),
            PolicyOutcome::Proceed { remaining: 0 }
        );
        reject(by_ip.evaluate(&registry, &anon));
    }

    #[test]
    fn test_guard_calls_exactly_one_continuation() {
        let (_, registry) = registry();
        let policy = small(PolicyKind::DatabaseIntensive, 1);
        let client = ClientIdentity::from_ip("1.2.3.4");

        let first = policy.guard(&registry, &client, || "proceed", |_| "respond");
        let second = policy.guard(&registry, &client, || "proceed", |_| "respond");

        assert_eq!(first, "proceed");
        assert_eq!(second, "respond");
    }

    #[test]
    fn test_retry_after_shrinks_as_time_passes() {
        let (clock, registry) = registry();
        let policy = small(PolicyKind::General, 1);
        let client = ClientIdentity::from_ip("1.2.3.4");
        policy.evaluate(&registry, &client);

        let first = reject(policy.evaluate(&registry, &client)).retry_after;
        clock.advance(Duration::from_secs(30));
        let second = reject(policy.evaluate(&registry, &client)).retry_after;

        assert_eq!(first, 60);
        assert_eq!(second, 30);
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(Duration::from_secs(15 * 60)), "15 minutos");
        assert_eq!(describe_window(Duration::from_secs(60)), "1 minuto");
        assert_eq!(describe_window(Duration::from_secs(3600)), "1 hora");
        assert_eq!(describe_window(Duration::from_secs(7200)), "2 horas");
        assert_eq!(describe_window(Duration::from_secs(1)), "1 segundo");
        assert_eq!(describe_window(Duration::from_secs(45)), "45 segundos");
        assert_eq!(describe_window(Duration::from_millis(1500)), "1500 ms");
    }

    #[test]
    fn test_policy_set_from_config() {
        let config = PoliciesConfig {
            excel_by_user: Some(LimitOverride {
                max_requests: Some(5),
                window_secs: Some(120),
            }),
            ..PoliciesConfig::default()
        };

        let set = PolicySet::from_config(&config).unwrap();
        let rule = set.get(PolicyKind::ExcelByUser).rule();
        assert_eq!(rule.max_requests(), 5);
        assert_eq!(rule.window(), Duration::from_secs(120));
        assert_eq!(set.get(PolicyKind::General), &Policy::general());

        for kind in PolicyKind::ALL {
            assert_eq!(set.get(kind).kind(), kind);
        }
    }
}
