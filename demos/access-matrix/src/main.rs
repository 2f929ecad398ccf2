//! # Purpose
//! Print the decision matrix of the reference policies for every kind of
//! subject against a public and two private projects.
//!
//! # High-level flow
//! 1. Load `AuthzConfig` from the environment (optional YAML override).
//! 2. Seed an in-memory membership store: a member with a developer role, a
//!    co-owner, and the project owner without any membership.
//! 3. Wrap the store in the membership cache when a TTL is configured.
//! 4. Authorize each `(subject, resource, action)` and print the grid.
//! 5. Render the authorization counters in Prometheus text format.
//!
//! # Running
//! `RUST_LOG=trellis_authz=debug cargo run -p access-matrix` shows each
//! decision as it is made.
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use trellis_authz::config::AuthzConfig;
use trellis_authz::observability::init_tracing;
use trellis_authz::store::MembershipStore;
use trellis_authz::store::cached::CachedMembershipStore;
use trellis_authz::store::memory::InMemoryMembershipStore;
use trellis_authz::{
    ACTION_CREATE, ACTION_DESTROY, ACTION_LIST, ACTION_RETRIEVE, ACTION_UPDATE, Authorizer,
    DenialKind, Membership, PermissionCatalog, PolicyRegistry, Project, ProjectObject,
    RESOURCE_USERSTORY, Resolvable, Role, Subject, Tier,
};
use trellis_common::ids::UserId;

const ACTIONS: [&str; 5] = [
    ACTION_RETRIEVE,
    ACTION_CREATE,
    ACTION_UPDATE,
    ACTION_DESTROY,
    ACTION_LIST,
];

struct Seeded {
    store: Arc<InMemoryMembershipStore>,
    subjects: Vec<(&'static str, Subject)>,
    projects: Vec<(&'static str, Project)>,
}

async fn seed(catalog: &PermissionCatalog) -> Result<Seeded> {
    let owner = UserId::new();
    let member = UserId::new();
    let co_owner = UserId::new();

    let anon_defaults: Vec<&str> = catalog.ids(Tier::Anon).collect();
    let user_defaults: Vec<&str> = catalog.ids(Tier::User).collect();
    let projects = vec![
        (
            "public",
            Project::new(owner)
                .with_anon_permissions(anon_defaults.iter().copied())
                .with_public_permissions(user_defaults.iter().copied()),
        ),
        (
            "private1",
            Project::new(owner)
                .private(true)
                .with_anon_permissions(anon_defaults.iter().copied())
                .with_public_permissions(user_defaults.iter().copied()),
        ),
        ("private2", Project::new(owner).private(true)),
    ];

    let developer_permissions = ["view_project", "view_uss", "add_us", "modify_us"];
    catalog
        .validate_role_permissions(&developer_permissions)
        .context("validate developer role")?;

    let store = Arc::new(InMemoryMembershipStore::new());
    for (_, project) in &projects {
        store
            .add_membership(Membership::new(
                member,
                Role::new(project.id, "developer", developer_permissions),
            ))
            .await
            .context("seed member")?;
        store
            .add_membership(
                Membership::new(co_owner, Role::new(project.id, "stakeholder", ["view_project"]))
                    .owner(true),
            )
            .await
            .context("seed co-owner")?;
    }

    Ok(Seeded {
        store,
        subjects: vec![
            ("anonymous", Subject::Anonymous),
            ("registered", Subject::user(UserId::new())),
            ("member", Subject::user(member)),
            ("co-owner", Subject::user(co_owner)),
            ("owner", Subject::user(owner)),
            ("superuser", Subject::superuser(UserId::new())),
        ],
        projects,
    })
}

async fn print_grid(
    authz: &Authorizer,
    subjects: &[(&'static str, Subject)],
    label: &str,
    resource: &dyn Resolvable,
) -> Result<()> {
    println!("\n{label}");
    println!(
        "  {:<12}{}",
        "",
        ACTIONS.iter().map(|a| format!("{a:<10}")).collect::<String>()
    );
    for (name, subject) in subjects {
        let mut row = String::new();
        for action in ACTIONS {
            let decision = authz
                .authorize(subject, resource, action)
                .await
                .with_context(|| format!("authorize {name} {action} on {label}"))?;
            let cell = match decision.denial_kind(subject) {
                None => "allow",
                Some(DenialKind::Unauthenticated) => "401",
                Some(DenialKind::Forbidden) => "403",
            };
            row.push_str(&format!("{cell:<10}"));
        }
        println!("  {name:<12}{row}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("install metrics recorder")?;

    let config = AuthzConfig::from_env_or_yaml().context("load authz config")?;
    let catalog = Arc::new(config.load_catalog()?);
    let seeded = seed(&catalog).await?;

    let store: Arc<dyn MembershipStore> = match config.membership_cache_ttl {
        Some(ttl) => {
            tracing::info!(ttl_ms = ttl.as_millis() as u64, "membership cache enabled");
            Arc::new(CachedMembershipStore::new(seeded.store.clone(), ttl))
        }
        None => seeded.store.clone(),
    };
    let authz = Authorizer::new(store, catalog, Arc::new(PolicyRegistry::reference()));

    for (label, project) in &seeded.projects {
        print_grid(&authz, &seeded.subjects, &format!("project/{label}"), project).await?;
        let story = ProjectObject::new(RESOURCE_USERSTORY, project);
        print_grid(&authz, &seeded.subjects, &format!("userstory/{label}"), &story).await?;
    }

    println!("\n{}", metrics.render());
    Ok(())
}
