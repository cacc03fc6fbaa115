//! Route handlers. Each handler checks the session, delegates to the auth
//! or watchlist service (or straight to the store) and ends in a rendered
//! view, a JSON body or a redirect.

use crate::database::Store;
use crate::error::AppError;
use crate::model::{Film, WatchStatus};
use crate::session;
use crate::{auth, watchlist};
use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type Tera = web::Data<tera::Tera>;
type State = web::Data<AppState>;

/// State shared across all workers; the store handle is injected here
/// instead of living in a global.
pub struct AppState {
    pub db: Arc<dyn Store>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/login", web::get().to(login_page))
        .route("/register", web::get().to(register_page))
        .route("/films", web::get().to(films_page))
        .route("/film", web::get().to(film_page))
        .route("/watchlist", web::get().to(watchlist_page))
        .route("/dashboard", web::get().to(dashboard_page))
        .route("/terms", web::get().to(terms_page))
        .route("/movies", web::get().to(movies))
        .route("/search", web::get().to(search_page))
        .route("/delete-account", web::get().to(delete_account_page))
        .route("/logout", web::get().to(logout))
        .route("/auth/register", web::post().to(register_post))
        .route("/auth/login", web::post().to(login_post))
        .route("/watchlist", web::post().to(watchlist_post))
        .route("/delete", web::post().to(delete_post));
}

fn render(
    tera: &tera::Tera,
    template: &str,
    ctx: &tera::Context,
) -> Result<HttpResponse, AppError> {
    let body = tera.render(template, ctx)?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("location", location))
        .finish()
}

/// Context holding just the optional logged-in user.
fn user_context(session: &Session) -> tera::Context {
    let mut ctx = tera::Context::new();
    if let Some(user) = session::current_user(session) {
        ctx.insert("current_user", &user);
    }
    ctx
}

async fn index(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    render(&tera, "index.html", &user_context(&session))
}

async fn login_page(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    if session::current_user(&session).is_some() {
        return Ok(redirect("/dashboard"));
    }
    render(&tera, "login.html", &tera::Context::new())
}

async fn register_page(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    if session::current_user(&session).is_some() {
        return Ok(redirect("/dashboard"));
    }
    render(&tera, "register.html", &tera::Context::new())
}

async fn films_page(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    // The catalog grid is filled in client-side from /movies.
    render(&tera, "films.html", &user_context(&session))
}

#[derive(Deserialize)]
struct FilmQuery {
    film_id: i64,
}

async fn film_page(
    query: web::Query<FilmQuery>,
    session: Session,
    tera: Tera,
    state: State,
) -> Result<HttpResponse, AppError> {
    let film = match state.db.film(query.film_id).await? {
        Some(film) => film,
        None => return Ok(HttpResponse::NotFound().body("No such film")),
    };
    let mut ctx = tera::Context::new();
    ctx.insert("film", &film);
    if let Some(user) = session::current_user(&session) {
        let (planned, watched) =
            watchlist::film_flags(state.db.as_ref(), user.user_id, query.film_id).await?;
        ctx.insert("current_user", &user);
        ctx.insert("planned", &planned);
        ctx.insert("watched", &watched);
    }
    render(&tera, "film.html", &ctx)
}

async fn watchlist_page(
    session: Session,
    tera: Tera,
    state: State,
) -> Result<HttpResponse, AppError> {
    let Some(user) = session::current_user(&session) else {
        return Ok(redirect("/login"));
    };
    let entries =
        watchlist::posters_for(state.db.as_ref(), user.user_id, WatchStatus::Planned).await?;
    let mut ctx = tera::Context::new();
    ctx.insert("current_user", &user);
    ctx.insert("watchlist", &entries);
    render(&tera, "watchlist.html", &ctx)
}

async fn dashboard_page(
    session: Session,
    tera: Tera,
    state: State,
) -> Result<HttpResponse, AppError> {
    let Some(user) = session::current_user(&session) else {
        return Ok(redirect("/login"));
    };
    let entries =
        watchlist::posters_for(state.db.as_ref(), user.user_id, WatchStatus::Watched).await?;
    let mut ctx = tera::Context::new();
    ctx.insert("current_user", &user);
    ctx.insert("watchlist", &entries);
    render(&tera, "dashboard.html", &ctx)
}

async fn terms_page(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    render(&tera, "terms.html", &user_context(&session))
}

#[derive(Serialize)]
struct MoviesPayload {
    movies: Vec<Film>,
}

/// JSON catalog for the client-side scripts.
async fn movies(state: State) -> Result<HttpResponse, AppError> {
    let movies = state.db.all_films().await?;
    Ok(HttpResponse::Ok().json(MoviesPayload { movies }))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_page(
    query: web::Query<SearchQuery>,
    session: Session,
    tera: Tera,
    state: State,
) -> Result<HttpResponse, AppError> {
    let results = state.db.search_films(&query.q).await?;
    let mut ctx = user_context(&session);
    ctx.insert("search_results", &results);
    ctx.insert("query_string", &query.q);
    render(&tera, "search.html", &ctx)
}

async fn delete_account_page(session: Session, tera: Tera) -> Result<HttpResponse, AppError> {
    let Some(user) = session::current_user(&session) else {
        return Ok(redirect("/login"));
    };
    let mut ctx = tera::Context::new();
    ctx.insert("current_user", &user);
    render(&tera, "delete-account.html", &ctx)
}

async fn logout(session: Session) -> Result<HttpResponse, AppError> {
    session::clear(&session);
    Ok(redirect("/"))
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    password_confirm: String,
}

async fn register_post(
    form: web::Form<RegisterForm>,
    session: Session,
    state: State,
) -> Result<HttpResponse, AppError> {
    let user = auth::register(
        state.db.as_ref(),
        &form.username,
        &form.password,
        &form.password_confirm,
    )
    .await?;
    session::establish(&session, &user)?;
    Ok(redirect("/dashboard"))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_post(
    form: web::Form<LoginForm>,
    session: Session,
    state: State,
) -> Result<HttpResponse, AppError> {
    let user = auth::login(state.db.as_ref(), &form.username, &form.password).await?;
    session::establish(&session, &user)?;
    Ok(redirect("/dashboard"))
}

#[derive(Deserialize)]
struct WatchlistForm {
    #[serde(rename = "filmID")]
    film_id: i64,
    status: WatchStatus,
}

async fn watchlist_post(
    form: web::Form<WatchlistForm>,
    session: Session,
    state: State,
) -> Result<HttpResponse, AppError> {
    let Some(user) = session::current_user(&session) else {
        return Ok(redirect("/login"));
    };
    watchlist::set_status(state.db.as_ref(), user.user_id, form.film_id, form.status).await?;
    Ok(redirect(&format!("/film?film_id={}", form.film_id)))
}

async fn delete_post(session: Session, state: State) -> Result<HttpResponse, AppError> {
    let Some(user) = session::current_user(&session) else {
        return Ok(redirect("/login"));
    };
    state.db.delete_user(user.user_id).await?;
    Ok(redirect("/logout"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mem::MemStore;
    use actix_session::storage::CookieSessionStore;
    use actix_session::SessionMiddleware;
    use actix_web::cookie::{Cookie, Key};
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    fn film(id: i64, title: &str) -> Film {
        Film {
            film_id: id,
            title: title.to_owned(),
            director: "Someone".to_owned(),
            year: 1999,
            tagline: "-".to_owned(),
            description: "A film.".to_owned(),
            poster: format!("/posters/{}.jpg", id),
        }
    }

    // A macro rather than a helper fn, so the opaque service type never
    // needs naming.
    macro_rules! test_app {
        ($store:expr) => {{
            let tera =
                tera::Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*")).unwrap();
            test::init_service(
                App::new()
                    .wrap(
                        SessionMiddleware::builder(
                            CookieSessionStore::default(),
                            Key::from(&[0u8; 64]),
                        )
                        .cookie_secure(false)
                        .build(),
                    )
                    .app_data(web::Data::new(tera))
                    .app_data(web::Data::new(AppState { db: $store }))
                    .configure(routes),
            )
            .await
        }};
    }

    fn location<B>(resp: &ServiceResponse<B>) -> &str {
        resp.headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
        resp.response()
            .cookies()
            .next()
            .expect("no session cookie set")
            .into_owned()
    }

    macro_rules! body_string {
        ($resp:expr) => {
            String::from_utf8(test::read_body($resp).await.to_vec()).unwrap()
        };
    }

    #[actix_web::test]
    async fn gated_routes_redirect_anonymous_users_to_login() {
        let app = test_app!(Arc::new(MemStore::default()));
        for uri in ["/watchlist", "/dashboard", "/delete-account"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request())
                .await;
            assert_eq!(resp.status(), StatusCode::FOUND, "{}", uri);
            assert_eq!(location(&resp), "/login", "{}", uri);
        }
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/watchlist")
                .set_form([("filmID", "5"), ("status", "planned")])
                .to_request(),
        )
        .await;
        assert_eq!(location(&resp), "/login");
        let resp =
            test::call_service(&app, test::TestRequest::post().uri("/delete").to_request()).await;
        assert_eq!(location(&resp), "/login");
    }

    #[actix_web::test]
    async fn register_establishes_a_session_and_redirects_to_dashboard() {
        let store = Arc::new(MemStore::default());
        let app = test_app!(store.clone());
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/register")
                .set_form([
                    ("username", "alice"),
                    ("password", "Passw0rd!"),
                    ("password_confirm", "Passw0rd!"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/dashboard");
        assert_eq!(store.user_count(), 1);

        // The login page bounces an active session back to the dashboard.
        let cookie = session_cookie(&resp);
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/login")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/dashboard");

        // And the dashboard itself renders.
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/dashboard")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn register_rejects_bad_input_without_creating_rows() {
        let store = Arc::new(MemStore::default());
        let app = test_app!(store.clone());
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/register")
                .set_form([
                    ("username", "alice"),
                    ("password", "short1"),
                    ("password_confirm", "short1"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.user_count(), 0);
    }

    #[actix_web::test]
    async fn duplicate_registration_is_a_conflict() {
        let store = Arc::new(MemStore::default());
        store.add_user("alice", &bcrypt::hash("Passw0rd!", 4).unwrap());
        let app = test_app!(store.clone());
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/register")
                .set_form([
                    ("username", "alice"),
                    ("password", "Passw0rd!"),
                    ("password_confirm", "Passw0rd!"),
                ])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(store.user_count(), 1);
    }

    #[actix_web::test]
    async fn failed_logins_get_identical_401_bodies() {
        let store = Arc::new(MemStore::default());
        store.add_user("alice", &bcrypt::hash("Passw0rd!", 4).unwrap());
        let app = test_app!(store);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_form([("username", "alice"), ("password", "Wr0ngPw!!")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let wrong_password = body_string!(resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_form([("username", "nobody"), ("password", "Passw0rd!")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let unknown_user = body_string!(resp);

        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password, "Invalid username or password");
    }

    #[actix_web::test]
    async fn watchlist_post_redirects_back_to_the_film() {
        let store = Arc::new(MemStore::with_films(vec![film(5, "The Matrix")]));
        store.add_user("alice", &bcrypt::hash("Passw0rd!", 4).unwrap());
        let app = test_app!(store.clone());
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_form([("username", "alice"), ("password", "Passw0rd!")])
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/watchlist")
                .cookie(cookie.clone())
                .set_form([("filmID", "5"), ("status", "planned")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/film?film_id=5");
        assert_eq!(store.entry_count(), 1);

        // The film page now shows the toggled state.
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/film?film_id=5")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_string!(resp);
        assert!(body.contains("Remove from watchlist"));
        assert!(body.contains("Mark as watched"));

        // An unknown status never reaches the service.
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/watchlist")
                .cookie(cookie)
                .set_form([("filmID", "5"), ("status", "maybe")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.entry_count(), 1);
    }

    #[actix_web::test]
    async fn movies_returns_the_json_envelope() {
        let store = Arc::new(MemStore::with_films(vec![film(5, "The Matrix")]));
        let app = test_app!(store);
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/movies").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let payload: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(payload["movies"][0]["filmID"], 5);
        assert_eq!(payload["movies"][0]["title"], "The Matrix");
        assert_eq!(payload["movies"][0]["poster"], "/posters/5.jpg");
    }

    #[actix_web::test]
    async fn search_is_case_insensitive_and_empty_matches_everything() {
        let store = Arc::new(MemStore::with_films(vec![
            film(5, "The Matrix"),
            film(7, "Heat"),
        ]));
        let app = test_app!(store);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/search?q=MATRIX").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_string!(resp);
        assert!(body.contains("The Matrix"));
        assert!(!body.contains("Heat"));

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/search").to_request()).await;
        let body = body_string!(resp);
        assert!(body.contains("The Matrix"));
        assert!(body.contains("Heat"));
    }

    #[actix_web::test]
    async fn film_page_is_404_for_an_unknown_film() {
        let app = test_app!(Arc::new(MemStore::default()));
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/film?film_id=99").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn delete_post_removes_the_account_and_chains_to_logout() {
        let store = Arc::new(MemStore::default());
        let app = test_app!(store.clone());
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/register")
                .set_form([
                    ("username", "alice"),
                    ("password", "Passw0rd!"),
                    ("password_confirm", "Passw0rd!"),
                ])
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/delete")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/logout");
        assert_eq!(store.user_count(), 0);
        assert_eq!(store.entry_count(), 0);
    }
}
