//! OpenAI converter, Mealie publisher and token refresh against local fakes.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use recipe_client::auth::{refresh_access_token, AuthorizedUser};
use recipe_client::mealie::MealieClient;
use recipe_client::openai::OpenAiConverter;
use recipe_client::pipeline::{RecipeConverter, RecipePublisher};
use recipe_common::config::OpenAiConfig;

#[derive(Default)]
struct Recorded {
    calls: Mutex<Vec<(String, Value)>>,
    tags: Mutex<Vec<Value>>,
}

type Shared = Arc<Recorded>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// --- OpenAI ---------------------------------------------------------------

async fn chat(State(st): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if bearer(&headers) != "Bearer sk-test" {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    st.calls.lock().unwrap().push(("chat".into(), body));
    let content = "```json\n{\"@type\": \"Recipe\", \"name\": \"Grandma's Chili\"}\n```";
    Json(json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }))
        .into_response()
}

fn openai_config(base: &str, key: &str, output_dir: Option<String>) -> OpenAiConfig {
    OpenAiConfig {
        api_key: key.into(),
        base_url: base.into(),
        output_dir,
        ..Default::default()
    }
}

#[tokio::test]
async fn converter_sends_prompt_and_saves_output() {
    let state: Shared = Arc::default();
    let base = serve(
        Router::new()
            .route("/chat/completions", post(chat))
            .with_state(state.clone()),
    )
    .await;
    let out = tempfile::tempdir().unwrap();
    let cfg = openai_config(&base, "sk-test", Some(out.path().join("recipes").display().to_string()));
    let converter = OpenAiConverter::new(reqwest::Client::new(), &cfg);

    let recipe = converter
        .convert("1 lb beans", &["Recipes".into(), "Soups".into()])
        .await
        .unwrap();
    assert_eq!(recipe["name"], "Grandma's Chili");

    let calls = state.calls.lock().unwrap().clone();
    let body = &calls[0].1;
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(
        body["messages"][0]["content"],
        "You are a recipe parser that converts recipe text to schema.org/Recipe JSON format."
    );
    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("Include the following tags: Recipes, Soups"));
    assert!(prompt.contains("1 lb beans"));

    let saved = std::fs::read_to_string(out.path().join("recipes").join("grandma-s-chili.json")).unwrap();
    let saved: Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved, recipe);
}

#[tokio::test]
async fn converter_reports_api_errors() {
    let state: Shared = Arc::default();
    let base = serve(
        Router::new()
            .route("/chat/completions", post(chat))
            .with_state(state),
    )
    .await;
    let converter = OpenAiConverter::new(reqwest::Client::new(), &openai_config(&base, "nope", None));

    let err = converter.convert("x", &[]).await.unwrap_err();
    assert!(err.to_string().contains("401"), "{err}");
}

// --- Mealie ---------------------------------------------------------------

async fn create_recipe(State(st): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    st.calls.lock().unwrap().push(("create".into(), body));
    Json(json!("grandmas-chili"))
}

async fn get_recipe(Path(slug): Path<String>) -> Response {
    if slug == "grandmas-chili" {
        Json(json!({ "slug": slug, "groupId": "g-1", "tags": [] })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "detail": "not found" }))).into_response()
    }
}

async fn patch_recipe(
    State(st): State<Shared>,
    Path(slug): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    st.calls.lock().unwrap().push((format!("patch {slug}"), body));
    Json(json!({}))
}

async fn list_tags(State(st): State<Shared>) -> Json<Value> {
    Json(json!({ "page": 1, "perPage": -1, "items": st.tags.lock().unwrap().clone() }))
}

async fn create_tag(State(st): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    st.calls.lock().unwrap().push(("create tag".into(), body.clone()));
    let tag = json!({
        "id": format!("t-{}", body["slug"].as_str().unwrap_or_default()),
        "name": body["name"],
        "slug": body["slug"],
        "groupId": "g-1",
    });
    st.tags.lock().unwrap().push(tag.clone());
    Json(tag)
}

async fn mealie() -> (MealieClient, Shared) {
    let state: Shared = Arc::default();
    state.tags.lock().unwrap().push(json!({
        "id": "t-recipes", "name": "Recipes", "slug": "recipes", "groupId": "g-1"
    }));
    let base = serve(
        Router::new()
            .route("/api/recipes/create/html-or-json", post(create_recipe))
            .route("/api/recipes/{slug}", get(get_recipe).patch(patch_recipe))
            .route("/api/organizers/tags", get(list_tags).post(create_tag))
            .with_state(state.clone()),
    )
    .await;
    (MealieClient::new(reqwest::Client::new(), &base, "mealie-token"), state)
}

#[tokio::test]
async fn publish_posts_recipe_as_json_string() {
    let (client, state) = mealie().await;
    let recipe = json!({ "name": "Grandma's Chili" });

    let slug = client.publish(&recipe).await.unwrap();
    assert_eq!(slug, "grandmas-chili");

    let calls = state.calls.lock().unwrap().clone();
    assert_eq!(calls[0].0, "create");
    assert_eq!(calls[0].1["includeTags"], true);
    let data: Value = serde_json::from_str(calls[0].1["data"].as_str().unwrap()).unwrap();
    assert_eq!(data, recipe);
}

#[tokio::test]
async fn tag_reuses_existing_tags_case_insensitively_and_creates_the_rest() {
    let (client, state) = mealie().await;

    client
        .tag("grandmas-chili", &["recipes".into(), "Main Dishes".into()])
        .await
        .unwrap();

    let calls = state.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "create tag");
    assert_eq!(calls[0].1, json!({ "name": "Main Dishes", "slug": "main-dishes" }));

    assert_eq!(calls[1].0, "patch grandmas-chili");
    let patch = &calls[1].1;
    assert_eq!(patch["groupId"], "g-1");
    let ids: Vec<&str> = patch["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["t-recipes", "t-main-dishes"]);
}

#[tokio::test]
async fn tag_fails_for_unknown_recipe() {
    let (client, state) = mealie().await;
    assert!(client.tag("missing", &["Soups".into()]).await.is_err());
    assert!(state.calls.lock().unwrap().is_empty());
}

// --- token refresh --------------------------------------------------------

async fn token(Form(form): Form<std::collections::HashMap<String, String>>) -> Response {
    if form.get("grant_type").map(String::as_str) != Some("refresh_token")
        || form.get("refresh_token").map(String::as_str) != Some("1//refresh")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" }))).into_response();
    }
    Json(json!({ "access_token": "ya29.fresh", "expires_in": 3599, "token_type": "Bearer" }))
        .into_response()
}

#[tokio::test]
async fn refresh_exchanges_token_file_credentials() {
    let base = serve(Router::new().route("/token", post(token))).await;
    let user = AuthorizedUser {
        client_id: "cid".into(),
        client_secret: "secret".into(),
        refresh_token: "1//refresh".into(),
    };

    let cred = refresh_access_token(&reqwest::Client::new(), &format!("{base}/token"), &user)
        .await
        .unwrap();
    assert_eq!(cred.access_token(), "ya29.fresh");

    let revoked = AuthorizedUser { refresh_token: "revoked".into(), ..user };
    assert!(refresh_access_token(&reqwest::Client::new(), &format!("{base}/token"), &revoked)
        .await
        .is_err());
}

#[tokio::test]
async fn token_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("google-token.json");
    std::fs::write(
        &path,
        r#"{"type":"authorized_user","client_id":"cid","client_secret":"s","refresh_token":"1//r"}"#,
    )
    .unwrap();

    let user = recipe_client::auth::read_token_file(path.to_str().unwrap()).await.unwrap();
    assert_eq!(user.refresh_token, "1//r");
}
