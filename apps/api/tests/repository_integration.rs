//! Integration tests for the Postgres repository layer
//!
//! These tests need a disposable database in DATABASE_URL and are ignored by
//! default. Run them with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use marketplace_api::auth::password::hash_password;
use marketplace_api::domain::application::{Application, ApplicationKind};
use marketplace_api::domain::audit::AuditFilter;
use marketplace_api::domain::brief::Brief;
use marketplace_api::domain::events::DomainEvent;
use marketplace_api::domain::framework::Lot;
use marketplace_api::domain::repositories::{
    ApplicationRepository, AuditRepository, BriefRepository, CatalogueRepository, ClaimAttempt,
    RepositoryError, SupplierRepository, TeamRepository, UserClaimRepository, UserRepository,
};
use marketplace_api::domain::team::value_objects::{Permission, TeamMember, TeamStatus};
use marketplace_api::domain::team::Team;
use marketplace_api::domain::user::{Email, User, UserRole};
use marketplace_api::domain::user_claim::{ClaimType, UserClaim};
use marketplace_api::infrastructure::repositories::{
    PostgresApplicationRepository, PostgresAuditRepository, PostgresBriefRepository,
    PostgresCatalogueRepository, PostgresSupplierRepository, PostgresTeamRepository,
    PostgresUserClaimRepository, PostgresUserRepository,
};
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Set up test database connection pool with the schema applied
async fn setup_test_db() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Emails are unique, so every test works with its own addresses
fn unique_email(prefix: &str, domain: &str) -> Email {
    Email::new(format!("{}-{}@{}", prefix, Uuid::new_v4().simple(), domain)).unwrap()
}

/// Create a test user
async fn create_test_user(pool: &PgPool, email: Email, role: UserRole) -> User {
    let password_hash = hash_password("testpass123", 4).expect("hash password");
    let user = User::new(email, password_hash, "Test User".to_string(), role);

    PostgresUserRepository::new(pool.clone())
        .create(&user, &[])
        .await
        .expect("Failed to create test user");
    user
}

#[tokio::test]
#[ignore]
async fn test_user_repository_create_and_find_by_email() {
    let pool = setup_test_db().await;
    let user_repo = PostgresUserRepository::new(pool.clone());

    let email = unique_email("buyer", "agency.gov.au");
    let user = create_test_user(&pool, email.clone(), UserRole::Buyer).await;

    let found = user_repo
        .find_by_email(&email)
        .await
        .expect("Failed to find user")
        .expect("User should exist");

    assert_eq!(found.id, user.id);
    assert_eq!(found.role, UserRole::Buyer);
    assert_eq!(found.email, email);
    assert!(found.is_active);
}

#[tokio::test]
#[ignore]
async fn test_user_repository_duplicate_email_conflicts() {
    let pool = setup_test_db().await;
    let user_repo = PostgresUserRepository::new(pool.clone());

    let email = unique_email("dup", "agency.gov.au");
    create_test_user(&pool, email.clone(), UserRole::Buyer).await;

    let again = User::new(email, "hash".to_string(), "Someone Else".to_string(), UserRole::Buyer);
    let result = user_repo.create(&again, &[]).await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
}

#[tokio::test]
#[ignore]
async fn test_claim_repository_claims_once() {
    let pool = setup_test_db().await;
    let claim_repo = PostgresUserClaimRepository::new(pool.clone());

    let email = unique_email("invitee", "agency.gov.au");
    let (claim, _) = UserClaim::make(
        ClaimType::JoinTeam,
        email.clone(),
        json!({ "teamName": "Digital team" }),
        Utc::now(),
    )
    .unwrap();
    claim_repo.create(&claim, &[]).await.expect("Failed to create claim");

    let first = claim_repo
        .claim(ClaimType::JoinTeam, claim.token(), &email, Some(Duration::days(7)), Utc::now())
        .await
        .expect("Claim query failed");
    match first {
        ClaimAttempt::Claimed(claimed) => assert!(claimed.claimed()),
        other => panic!("Expected claim to succeed, got {:?}", other),
    }

    let second = claim_repo
        .claim(ClaimType::JoinTeam, claim.token(), &email, Some(Duration::days(7)), Utc::now())
        .await
        .expect("Claim query failed");
    assert!(matches!(second, ClaimAttempt::Rejected(_)));

    let wrong_type = claim_repo
        .claim(ClaimType::Signup, claim.token(), &email, None, Utc::now())
        .await
        .expect("Claim query failed");
    assert!(matches!(wrong_type, ClaimAttempt::NotFound));
}

#[tokio::test]
#[ignore]
async fn test_brief_repository_save_and_find() {
    let pool = setup_test_db().await;
    let brief_repo = PostgresBriefRepository::new(pool.clone());
    let framework = PostgresCatalogueRepository::new(pool.clone())
        .find_framework_by_slug("digital-marketplace")
        .await
        .expect("Failed to load framework")
        .expect("Seeded framework should exist");

    let author = create_test_user(&pool, unique_email("author", "agency.gov.au"), UserRole::Buyer).await;
    let (brief, _) = Brief::new_draft(
        &framework,
        Lot::Atm,
        author.id,
        None,
        json!({ "title": "Ask the market", "openTo": "all" }),
        Utc::now(),
    )
    .unwrap();
    brief_repo.save(&brief, &[]).await.expect("Failed to save brief");

    let found = brief_repo
        .find_by_id(brief.id())
        .await
        .expect("Failed to find brief")
        .expect("Brief should exist");
    assert_eq!(found.lot(), Lot::Atm);
    assert_eq!(found.author_id(), author.id);
    assert_eq!(found.title(), "Ask the market");

    brief_repo.delete(brief.id(), &[]).await.expect("Failed to delete brief");
    assert!(brief_repo.find_by_id(brief.id()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_team_repository_saves_members_and_permissions() {
    let pool = setup_test_db().await;
    let team_repo = PostgresTeamRepository::new(pool.clone());

    let lead = create_test_user(&pool, unique_email("lead", "agency.gov.au"), UserRole::Buyer).await;
    let member = create_test_user(&pool, unique_email("member", "agency.gov.au"), UserRole::Buyer).await;

    let permissions: BTreeSet<Permission> =
        [Permission::CreateDrafts, Permission::AnswerSellerQuestions].into_iter().collect();
    let now = Utc::now();
    let team = Team::from_persistence(
        Uuid::new_v4(),
        "Digital team".to_string(),
        None,
        TeamStatus::Completed,
        vec![TeamMember::lead(lead.id), TeamMember::member(member.id, permissions.clone())],
        now,
        now,
    );
    let completed = DomainEvent::TeamCompleted { team_id: team.id() }.into_audit(Some("lead@agency.gov.au"));
    team_repo
        .save(&team, &[completed.clone()])
        .await
        .expect("Failed to save team");

    let found = team_repo
        .find_by_id(team.id())
        .await
        .expect("Failed to find team")
        .expect("Team should exist");
    assert_eq!(found.name(), "Digital team");
    assert_eq!(found.status(), TeamStatus::Completed);
    assert_eq!(found.members().len(), 2);
    let saved_member = found
        .members()
        .iter()
        .find(|m| m.user_id == member.id)
        .expect("Member should be saved");
    assert!(!saved_member.is_team_lead);
    assert_eq!(saved_member.permissions, permissions);

    let teams = team_repo
        .teams_for_user(member.id)
        .await
        .expect("Failed to list teams");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id(), team.id());

    let filter = AuditFilter {
        object_type: Some("team".to_string()),
        object_id: Some(team.id()),
        ..Default::default()
    };
    let events = PostgresAuditRepository::new(pool.clone())
        .list(&filter)
        .await
        .expect("Failed to list events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id(), completed.id());
}

#[tokio::test]
#[ignore]
async fn test_application_repository_second_approval_conflicts() {
    let pool = setup_test_db().await;
    let application_repo = PostgresApplicationRepository::new(pool.clone());

    let (mut application, _) = Application::new(
        ApplicationKind::New,
        None,
        json!({
            "name": "Acme Digital",
            "abn": "12 345 678 901",
            "representative": "Ada Lovelace",
            "phone": "02 6123 4567",
            "email": "ada@acme.com",
            "understandsAssessmentProcess": true
        }),
        Utc::now(),
    )
    .unwrap();
    application.submit_for_approval(Utc::now()).unwrap();
    application_repo
        .save(&application, &[])
        .await
        .expect("Failed to save application");

    let mut stale = application.clone();
    let approval = application.approve(None, Utc::now()).unwrap();
    application_repo
        .record_approval(&application, &approval.supplier, &[], &[])
        .await
        .expect("First approval succeeds");

    let second = stale.approve(None, Utc::now()).unwrap();
    let result = application_repo
        .record_approval(&stale, &second.supplier, &[], &[])
        .await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    let supplier = PostgresSupplierRepository::new(pool.clone())
        .find_by_id(second.supplier.id)
        .await
        .expect("Failed to query supplier");
    assert!(supplier.is_none());
}

#[tokio::test]
#[ignore]
async fn test_audit_repository_list_and_acknowledge() {
    let pool = setup_test_db().await;
    let audit_repo = PostgresAuditRepository::new(pool.clone());

    let team_id = Uuid::new_v4();
    let event = DomainEvent::TeamUpdated { team_id }.into_audit(Some("lead@agency.gov.au"));
    audit_repo.append(&event).await.expect("Failed to append event");

    let filter = AuditFilter {
        object_type: Some("team".to_string()),
        object_id: Some(team_id),
        ..Default::default()
    };
    let events = audit_repo.list(&filter).await.expect("Failed to list events");
    assert_eq!(events.len(), 1);
    assert!(!events[0].acknowledged());

    let mut stored = events[0].clone();
    stored
        .acknowledge("admin@digital.gov.au", Utc::now())
        .expect("First acknowledgement succeeds");
    audit_repo
        .save_acknowledgement(&stored)
        .await
        .expect("Failed to save acknowledgement");

    let reloaded = audit_repo
        .find_by_id(stored.id())
        .await
        .expect("Failed to find event")
        .expect("Event should exist");
    assert!(reloaded.acknowledged());
    assert_eq!(reloaded.acknowledged_by(), Some("admin@digital.gov.au"));
    assert_eq!(reloaded.user(), Some("lead@agency.gov.au"));
}
