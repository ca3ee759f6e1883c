//! Administrator console server: JSON API over the round-progression controller.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default and talks to the tournament service at BACKEND_URL.
//! See `chess_union_admin::config` for the environment variables.

use actix_session::{storage::CookieSessionStore, Session as CookieSession, SessionMiddleware};
use actix_web::{
    cookie::Key,
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chess_union_admin::{
    check_registration, fetch_round_snapshot, register, Config, Credentials,
    HttpTournamentService, MatchId, Outcome, Precondition, ProgressionController,
    ProgressionError, RegistrationError, RegistrationVeto, ServiceError, Session, TournamentId,
    TournamentService,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

type Console = ProgressionController<HttpTournamentService>;

/// Cookie-session key under which the caller's [`Session`] is stored.
const SESSION_COOKIE_KEY: &str = "session";

/// Per-console entry: the controller, who opened it, and last activity (for auto-cleanup).
struct ConsoleEntry {
    console: Arc<Mutex<Console>>,
    owner: Session,
    last_activity: Instant,
}

struct ServerState {
    service: HttpTournamentService,
    consoles: RwLock<HashMap<Uuid, ConsoleEntry>>,
}

type AppState = Data<ServerState>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct OpenConsoleBody {
    tournament_id: TournamentId,
}

#[derive(Deserialize)]
struct StageResultBody {
    match_id: MatchId,
    /// 1, 0, 0.5, or null for an explicit reset to undecided.
    #[serde(default)]
    result: Option<Outcome>,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id}/registration)
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segment: console id (e.g. /api/consoles/{id})
#[derive(Deserialize)]
struct ConsolePath {
    id: Uuid,
}

/// Path segments: console id and match id (e.g. /api/consoles/{id}/results/{match_id})
#[derive(Deserialize)]
struct ConsoleMatchPath {
    id: Uuid,
    match_id: MatchId,
}

fn error_body(message: impl ToString) -> serde_json::Value {
    serde_json::json!({ "error": message.to_string() })
}

/// The caller's session from the cookie; anonymous when absent or unreadable.
fn caller_session(cookie: &CookieSession) -> Session {
    match cookie.get::<Session>(SESSION_COOKIE_KEY) {
        Ok(Some(session)) => session,
        Ok(None) => Session::anonymous(),
        Err(e) => {
            log::warn!("Discarding unreadable session cookie: {}", e);
            cookie.purge();
            Session::anonymous()
        }
    }
}

fn remote_error(e: &ServiceError) -> HttpResponse {
    match e {
        ServiceError::Status { status: 401, .. } => HttpResponse::Unauthorized().json(error_body(e)),
        ServiceError::Status { status: 403, .. } => HttpResponse::Forbidden().json(error_body(e)),
        _ => HttpResponse::BadGateway().json(error_body(e)),
    }
}

fn progression_error(e: &ProgressionError) -> HttpResponse {
    match e {
        ProgressionError::Precondition(Precondition::NotAdministrator) => {
            HttpResponse::Forbidden().json(error_body(e))
        }
        ProgressionError::Precondition(_) => HttpResponse::Conflict().json(error_body(e)),
        ProgressionError::Remote(remote) => remote_error(remote),
    }
}

/// Look up a console opened by this caller and refresh its last activity.
fn console_for(state: &AppState, id: Uuid, caller: &Session) -> Result<Arc<Mutex<Console>>, HttpResponse> {
    let mut g = match state.consoles.write() {
        Ok(guard) => guard,
        Err(_) => return Err(HttpResponse::InternalServerError().body("lock error")),
    };
    let entry = match g.get_mut(&id) {
        Some(e) => e,
        None => return Err(HttpResponse::NotFound().json(error_body("No console"))),
    };
    if &entry.owner != caller {
        return Err(HttpResponse::Forbidden().json(error_body("Console belongs to another session")));
    }
    entry.last_activity = Instant::now();
    Ok(entry.console.clone())
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "chess-union-admin",
    })
}

/// Exchange credentials for a token and keep the resulting session in the cookie.
#[post("/api/session/login")]
async fn api_login(state: AppState, cookie: CookieSession, body: Json<Credentials>) -> HttpResponse {
    let grant = match state.service.login(&body).await {
        Ok(grant) => grant,
        Err(e) => {
            log::warn!("Login for {} failed: {}", body.login, e);
            return remote_error(&e);
        }
    };
    let session = Session::from_grant(grant);
    cookie.renew();
    if let Err(e) = cookie.insert(SESSION_COOKIE_KEY, &session) {
        log::warn!("Could not store session: {}", e);
        return HttpResponse::InternalServerError().json(error_body("Could not store session"));
    }
    log::info!("{} logged in as {:?}", body.login, session.role());
    HttpResponse::Ok().json(serde_json::json!({ "role": session.role() }))
}

/// Drop the session and every console it opened.
#[post("/api/session/logout")]
async fn api_logout(state: AppState, cookie: CookieSession) -> HttpResponse {
    let mut session = caller_session(&cookie);
    if session.is_authenticated() {
        if let Ok(mut g) = state.consoles.write() {
            g.retain(|_, entry| entry.owner != session);
        }
    }
    session.logout();
    cookie.purge();
    HttpResponse::NoContent().finish()
}

/// Whether the caller may register (and why not).
#[get("/api/tournaments/{id}/registration")]
async fn api_registration_status(state: AppState, cookie: CookieSession, path: Path<TournamentPath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    match check_registration(&state.service, &caller, path.id).await {
        Ok(decision) => HttpResponse::Ok().json(decision),
        Err(e) => remote_error(&e),
    }
}

/// Register the caller for the tournament.
#[post("/api/tournaments/{id}/registration")]
async fn api_register(state: AppState, cookie: CookieSession, path: Path<TournamentPath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    match register(&state.service, &caller, path.id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "registered": true })),
        Err(RegistrationError::Veto(RegistrationVeto::NotAuthenticated)) => {
            HttpResponse::Unauthorized().json(error_body(RegistrationVeto::NotAuthenticated))
        }
        Err(RegistrationError::Veto(veto)) => HttpResponse::Conflict().json(serde_json::json!({
            "error": veto.to_string(),
            "veto": veto,
        })),
        Err(RegistrationError::Remote(e)) => remote_error(&e),
    }
}

/// Open a console for a tournament (administrators only).
#[post("/api/consoles")]
async fn api_open_console(state: AppState, cookie: CookieSession, body: Json<OpenConsoleBody>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match ProgressionController::open(state.service.clone(), caller.clone(), body.tournament_id).await {
        Ok(c) => c,
        Err(e) => return progression_error(&e),
    };
    let view = console.view();
    let id = Uuid::new_v4();
    let mut g = match state.consoles.write() {
        Ok(guard) => guard,
        Err(_) => return HttpResponse::InternalServerError().body("lock error"),
    };
    g.insert(
        id,
        ConsoleEntry {
            console: Arc::new(Mutex::new(console)),
            owner: caller,
            last_activity: Instant::now(),
        },
    );
    log::info!("Opened console {} for tournament {}", id, body.tournament_id);
    HttpResponse::Ok().json(serde_json::json!({ "console_id": id, "console": view }))
}

/// Reload from the tournament service. The console stays usable while the fetch is in flight;
/// if another action starts meanwhile, this reload's result is dropped.
#[get("/api/consoles/{id}")]
async fn api_get_console(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let (request, service) = {
        let mut c = console.lock().await;
        (c.begin_refresh(), c.service().clone())
    };
    let snapshot = fetch_round_snapshot(&service, request.tournament_id).await;
    let mut c = console.lock().await;
    match snapshot {
        Ok(snapshot) => {
            c.apply_refresh(request.ticket, snapshot);
            HttpResponse::Ok().json(c.view())
        }
        Err(e) => {
            log::warn!("Console {}: reload failed: {}", path.id, e);
            remote_error(&e)
        }
    }
}

/// Stage a result for a match of the active round.
#[put("/api/consoles/{id}/results")]
async fn api_stage_result(
    state: AppState,
    cookie: CookieSession,
    path: Path<ConsolePath>,
    body: Json<StageResultBody>,
) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.stage_result(body.match_id, body.result) {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

/// Drop the staged edit for a match.
#[delete("/api/consoles/{id}/results/{match_id}")]
async fn api_discard_result(state: AppState, cookie: CookieSession, path: Path<ConsoleMatchPath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    c.discard_edit(path.match_id);
    HttpResponse::Ok().json(c.view())
}

/// Save staged results.
#[post("/api/consoles/{id}/commit")]
async fn api_commit(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.commit_staged().await {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

/// Generate round 1 (Registration -> Playing).
#[post("/api/consoles/{id}/draw")]
async fn api_start_draw(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.start_draw().await {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

/// Save staged results, then generate the next round.
#[post("/api/consoles/{id}/advance")]
async fn api_advance(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.advance_round().await {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

/// Save staged results of the final round, then finish the tournament.
#[post("/api/consoles/{id}/finish")]
async fn api_finish(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.finish().await {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

/// Discard the active round (destructive).
#[post("/api/consoles/{id}/rollback")]
async fn api_rollback(state: AppState, cookie: CookieSession, path: Path<ConsolePath>) -> HttpResponse {
    let caller = caller_session(&cookie);
    let console = match console_for(&state, path.id, &caller) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mut c = console.lock().await;
    match c.rollback().await {
        Ok(()) => HttpResponse::Ok().json(c.view()),
        Err(e) => progression_error(&e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let service = HttpTournamentService::new(config.backend_url.clone(), config.request_timeout)
        .map_err(std::io::Error::other)?;
    let key = match &config.session_key {
        Some(bytes) => Key::from(bytes.as_slice()),
        None => {
            log::warn!("SESSION_KEY not set; sessions will not survive a restart");
            Key::generate()
        }
    };

    let bind = (config.host.clone(), config.port);
    log::info!(
        "Starting console at http://{}:{} (tournament service: {})",
        bind.0,
        bind.1,
        service.base_url()
    );

    let state = Data::new(ServerState {
        service,
        consoles: RwLock::new(HashMap::new()),
    });

    // Background task: every 30 minutes, remove consoles idle for longer than the configured timeout
    let state_cleanup = state.clone();
    let idle_timeout = config.console_idle_timeout;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let mut g = match state_cleanup.consoles.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let before = g.len();
            g.retain(|_, entry| entry.last_activity.elapsed() < idle_timeout);
            let removed = before - g.len();
            if removed > 0 {
                log::info!("Cleaned up {} idle console(s)", removed);
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware::new(CookieSessionStore::default(), key.clone()))
            .service(api_health)
            .service(api_login)
            .service(api_logout)
            .service(api_registration_status)
            .service(api_register)
            .service(api_open_console)
            .service(api_get_console)
            .service(api_stage_result)
            .service(api_discard_result)
            .service(api_commit)
            .service(api_start_draw)
            .service(api_advance)
            .service(api_finish)
            .service(api_rollback)
    })
    .bind(bind)?
    .run()
    .await
}
