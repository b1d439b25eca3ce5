use async_trait::async_trait;
use cape::graph::{EscalationEdge, PrincipalNode, Tristate};
use cape::provider::{EscalationData, IdentityListing};
use cape::{
    load_report, AccountLedger, CapeConfig, CapeError, CapeRunner, CollectStage, Collector,
    EscalationProvider, IdentityProvider, ProfileTarget, ProviderError, ProviderResult,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const GOOD: &str = "111111111111";
const BROKEN: &str = "222222222222";
const PANICKY: &str = "999999999999";

struct MockEscalation;

#[async_trait]
impl EscalationProvider for MockEscalation {
    async fn escalation_data(&self, target: &ProfileTarget) -> ProviderResult<EscalationData> {
        match target.account_id.as_str() {
            GOOD => Ok(EscalationData {
                nodes: vec![
                    PrincipalNode::from_arn("arn:aws:iam::111111111111:user/dev").with_admin(false),
                    PrincipalNode::from_arn("arn:aws:iam::111111111111:role/Admin").with_admin(true),
                ],
                edges: vec![EscalationEdge::new(
                    "arn:aws:iam::111111111111:user/dev",
                    "arn:aws:iam::111111111111:role/Admin",
                    "iam:AttachUserPolicy",
                    "dev can attach AdministratorAccess to itself",
                )],
            }),
            PANICKY => panic!("provider crashed"),
            _ => Err(ProviderError::NotFound {
                what: "pmapper graph".into(),
                path: Path::new("/nowhere").to_path_buf(),
            }),
        }
    }
}

struct MockIdentities;

#[async_trait]
impl IdentityProvider for MockIdentities {
    async fn list_identities(&self, target: &ProfileTarget) -> ProviderResult<IdentityListing> {
        let role = format!("arn:aws:iam::{}:role/ReadOnly", target.account_id);
        Ok(IdentityListing {
            roles: vec![PrincipalNode::from_arn(&role).with_admin(false)],
            users: Vec::new(),
        })
    }
}

fn collector() -> Collector {
    Collector::new(Arc::new(MockEscalation), Arc::new(MockIdentities))
}

#[tokio::test]
async fn test_failed_account_does_not_stop_others() {
    let targets = vec![
        ProfileTarget::new("good", GOOD),
        ProfileTarget::new("broken", BROKEN),
    ];
    let mut ledger = AccountLedger::new();
    let contributions = collector().collect(&targets, &mut ledger).await.unwrap();

    assert_eq!(contributions.len(), 2);
    assert!(contributions[0].is_complete());
    assert_eq!(contributions[0].nodes.len(), 3);
    assert_eq!(contributions[0].escalation_edges.len(), 1);

    let broken = &contributions[1];
    assert_eq!(broken.target.account_id, BROKEN);
    assert_eq!(broken.failures.len(), 1);
    assert_eq!(broken.failures[0].stage, CollectStage::Escalation);
    // The identity listing still came through
    assert_eq!(broken.nodes.len(), 1);

    assert!(ledger.is_analyzed(GOOD));
    let record = ledger.get(BROKEN).unwrap();
    assert!(!record.analyzed_successfully);
    assert_eq!(record.profile, "broken");
    assert_eq!(record.notes.len(), 1);
}

#[tokio::test]
async fn test_panicking_task_marks_account() {
    let targets = vec![
        ProfileTarget::new("crash", PANICKY),
        ProfileTarget::new("good", GOOD),
    ];
    let mut ledger = AccountLedger::new();
    let contributions = collector().collect(&targets, &mut ledger).await.unwrap();

    assert_eq!(contributions[0].failures[0].stage, CollectStage::Task);
    assert!(contributions[0].nodes.is_empty());
    assert!(!ledger.is_analyzed(PANICKY));
    assert!(contributions[1].is_complete());
}

#[tokio::test]
async fn test_abort_without_local_data() {
    let targets = vec![
        ProfileTarget::new("good", GOOD),
        ProfileTarget::new("broken", BROKEN),
    ];
    let mut ledger = AccountLedger::new();
    let result = collector()
        .continue_without_local_data(false)
        .collect(&targets, &mut ledger)
        .await;

    match result {
        Err(CapeError::LocalDataUnavailable {
            profile,
            account_id,
        }) => {
            assert_eq!(profile, "broken");
            assert_eq!(account_id, BROKEN);
        }
        other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
    }
}

#[tokio::test]
async fn test_runner_with_mock_providers() {
    let out = TempDir::new().unwrap();
    let config = CapeConfig {
        output_dir: out.path().to_path_buf(),
        admin_only: true,
        profiles: vec![
            ProfileTarget::new("good", GOOD),
            ProfileTarget::new("broken", BROKEN),
        ],
        ignore_list: Some(out.path().join("missing-ignore.txt")),
        ..CapeConfig::default()
    };

    let runner = CapeRunner::with_providers(config, Arc::new(MockEscalation), Arc::new(MockIdentities));
    let outcome = runner.run().await.unwrap();

    assert!(outcome.ignore_list_error.is_some());
    assert_eq!(outcome.paths.len(), 1);
    assert_eq!(outcome.written.len(), 2);
    assert!(outcome.accounts.iter().all(|r| r.admin_only_analysis));

    // Broken account: listed role without local data reads unknown
    let read_only = outcome
        .graph
        .vertex("arn:aws:iam::222222222222:role/ReadOnly")
        .unwrap();
    assert_eq!(read_only.is_admin, Tristate::Unknown);

    let report = load_report(&outcome.written[0]).await.unwrap();
    assert_eq!(report.paths, outcome.paths);
    assert!(report.accounts.iter().any(|r| r.account_id == BROKEN && !r.analyzed_successfully));
}

fn write(base: &Path, rel: &str, body: &str) {
    let path = base.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn test_runner_with_file_providers() {
    let data = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    // Account A: dev can escalate to Admin locally
    write(
        data.path(),
        "pmapper/111111111111/graph/nodes.json",
        r#"[{"arn": "arn:aws:iam::111111111111:user/dev", "is_admin": false},
            {"arn": "arn:aws:iam::111111111111:role/Admin", "is_admin": true}]"#,
    );
    write(
        data.path(),
        "pmapper/111111111111/graph/edges.json",
        r#"[{"source": "arn:aws:iam::111111111111:user/dev", "destination": "arn:aws:iam::111111111111:role/Admin",
             "reason": "can call sts:AssumeRole to access", "short_reason": "STS"}]"#,
    );
    write(data.path(), "iam/111111111111/users.json", r#"{"Users": [{"UserName": "dev", "Arn": "arn:aws:iam::111111111111:user/dev"}]}"#);
    write(data.path(), "iam/111111111111/roles.json", r#"{"Roles": []}"#);

    // Account B: Deploy role trusts account A; no local pmapper data
    write(
        data.path(),
        "iam/222222222222/roles.json",
        r#"{"Roles": [{"RoleName": "Deploy", "Arn": "arn:aws:iam::222222222222:role/Deploy",
            "AssumeRolePolicyDocument": {"Version": "2012-10-17", "Statement": [
                {"Effect": "Allow", "Principal": {"AWS": "arn:aws:iam::111111111111:root"}, "Action": "sts:AssumeRole"}]}}]}"#,
    );
    write(data.path(), "iam/222222222222/users.json", r#"{"Users": []}"#);
    write(data.path(), "ignore.txt", "# nothing ignored yet\n");

    let config = CapeConfig {
        output_dir: out.path().to_path_buf(),
        pmapper_data_path: data.path().join("pmapper"),
        identity_data_path: data.path().join("iam"),
        ignore_list: Some(data.path().join("ignore.txt")),
        admin_only: false,
        profiles: vec![ProfileTarget::new("a", GOOD), ProfileTarget::new("b", BROKEN)],
        ..CapeConfig::default()
    };

    let outcome = CapeRunner::from_config(config).await.unwrap().run().await.unwrap();
    assert!(outcome.ignore_list_error.is_none());

    // The admin of account A reaches Deploy through account-root trust
    let deploy = "arn:aws:iam::222222222222:role/Deploy";
    assert!(outcome
        .graph
        .edge("arn:aws:iam::111111111111:role/Admin", deploy)
        .is_ok());
    let dev_to_deploy = outcome
        .paths
        .iter()
        .find(|p| p.source == "arn:aws:iam::111111111111:user/dev" && p.destination == deploy)
        .unwrap();
    assert_eq!(dev_to_deploy.hop_count(), 2);

    assert!(outcome.ledger.is_analyzed(GOOD));
    assert!(!outcome.ledger.is_analyzed(BROKEN));
    assert_eq!(outcome.written.len(), 2);
}
