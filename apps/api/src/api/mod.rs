// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::{applications, audit, auth, brief_responses, briefs, claims, evidence, teams};
pub use state::AppState;

/// Builds the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(auth::health_check))
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/users/me", get(auth::me))
        // Opportunities
        .route("/api/briefs", post(briefs::create_brief))
        .route(
            "/api/briefs/:id",
            get(briefs::get_brief)
                .patch(briefs::update_brief)
                .delete(briefs::delete_brief),
        )
        .route("/api/briefs/:id/status", put(briefs::set_brief_status))
        .route("/api/briefs/:id/withdraw", post(briefs::withdraw_brief))
        .route("/api/briefs/:id/close", post(briefs::close_brief))
        .route("/api/briefs/:id/copy", post(briefs::copy_brief))
        .route("/api/briefs/:id/edit", patch(briefs::edit_brief))
        .route("/api/briefs/:id/history", get(briefs::brief_history))
        // Responses
        .route("/api/briefs/:id/respond", post(brief_responses::create_response))
        .route(
            "/api/briefs/:id/respond/:response_id",
            patch(brief_responses::update_response),
        )
        .route("/api/brief-responses/:id", get(brief_responses::get_response))
        .route(
            "/api/brief-responses/:id/withdraw",
            put(brief_responses::withdraw_response),
        )
        // Seller applications
        .route("/api/applications", post(applications::create_application))
        .route(
            "/api/applications/:id",
            get(applications::get_application)
                .patch(applications::update_application)
                .delete(applications::delete_application),
        )
        .route("/api/applications/:id/submit", post(applications::submit_application))
        .route("/api/applications/:id/approve", post(applications::approve_application))
        .route("/api/applications/:id/reject", post(applications::reject_application))
        .route("/api/applications/:id/revert", post(applications::revert_application))
        .route("/api/applications/:id/unreject", post(applications::unreject_application))
        // Domain assessments
        .route(
            "/api/evidence/:id",
            post(evidence::start_evidence)
                .get(evidence::get_evidence)
                .patch(evidence::update_evidence)
                .delete(evidence::delete_evidence),
        )
        .route("/api/evidence/:id/feedback", get(evidence::evidence_feedback))
        .route("/api/evidence/:id/approve", post(evidence::approve_evidence))
        .route("/api/evidence/:id/reject", post(evidence::reject_evidence))
        // Teams
        .route("/api/teams", post(teams::create_team))
        .route("/api/teams/:id", get(teams::get_team).patch(teams::update_team))
        // User claims
        .route("/api/claims", post(claims::create_claim))
        .route("/api/claims/validate", post(claims::validate_claim))
        // Audit
        .route("/api/audit-events", get(audit::list_audit_events))
        .route(
            "/api/audit-events/:id/acknowledge",
            post(audit::acknowledge_audit_event),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(state)
}
