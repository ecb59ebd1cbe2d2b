// tests/progress_tests.rs

use std::sync::Arc;

use exam_prep::{
    config::{Config, LlmConfig},
    routes,
    services::tutor::DisabledProvider,
    state::AppState,
};
use sqlx::{PgPool, postgres::PgPoolOptions};

/// A stored row of `user_answers`.
#[derive(Debug, sqlx::FromRow)]
struct StoredAnswer {
    selected_option: i32,
    is_correct: bool,
}

struct TestApp {
    address: String,
    pool: PgPool,
}

/// Spawns the app on a random port.
/// Note: For Postgres, you must have a running database reachable via DATABASE_URL.
async fn spawn_app() -> TestApp {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: "progress_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
        llm: LlmConfig::default(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        tutor: Arc::new(DisabledProvider),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

fn unique_email() -> String {
    format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a fresh user and returns its bearer token.
async fn register_and_login(app: &TestApp, client: &reqwest::Client, email: &str) -> String {
    let response = client
        .post(&format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "email": email,
            "name": "Test Student",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["accessToken"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

async fn seed_subject(pool: &PgPool) -> i64 {
    let name = format!("Subject {}", uuid::Uuid::new_v4());
    sqlx::query_scalar(
        "INSERT INTO subjects (name, description, icon, color) VALUES ($1, 'Test', 'book', '#000') RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_question(pool: &PgPool, subject_id: i64, correct_option: i32) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO questions (subject_id, question_text, options, correct_option, topic, difficulty)
        VALUES ($1, 'What is 2 + 2?', $2, $3, 'Arithmetic', 'easy')
        RETURNING id
        "#,
    )
    .bind(subject_id)
    .bind(serde_json::json!(["3", "4", "5", "6"]))
    .bind(correct_option)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn submit(
    app: &TestApp,
    client: &reqwest::Client,
    token: &str,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(&format!("{}/api/test/submit", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .expect("Submit failed")
}

fn answer(question_id: i64, selected_option: i32) -> serde_json::Value {
    serde_json::json!({
        "questionId": question_id,
        "selectedOption": selected_option,
        "isCorrect": true,
        "timeSpent": 15
    })
}

fn badge_names(response: &serde_json::Value) -> Vec<String> {
    response["newBadges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn submit_scores_and_awards_xp() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&app, &client, &unique_email()).await;
    let subject_id = seed_subject(&app.pool).await;
    let q1 = seed_question(&app.pool, subject_id, 1).await;
    let q2 = seed_question(&app.pool, subject_id, 1).await;

    // The client claims both are correct, the server only accepts q1.
    let response = submit(
        &app,
        &client,
        &token,
        serde_json::json!({ "subjectId": subject_id, "answers": [answer(q1, 1), answer(q2, 0)] }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    let result: serde_json::Value = response.json().await.unwrap();

    assert_eq!(result["xpEarned"], 10);
    assert_eq!(result["totalXp"], 10);
    assert_eq!(result["newLevel"], 1);
    assert_eq!(result["correctAnswers"], 1);
    assert_eq!(result["totalQuestions"], 2);
    assert_eq!(result["accuracy"], 50);
    assert!(badge_names(&result).contains(&"First Steps".to_string()));

    let stats: serde_json::Value = client
        .get(&format!("{}/api/user/stats", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalAnswers"], 2);
    assert_eq!(stats["correctAnswers"], 1);
    assert_eq!(stats["averageScore"], 50);
    assert_eq!(stats["totalTests"], 1);
    assert_eq!(stats["currentStreak"], 1);
    assert_eq!(stats["currentXp"], 10);
    assert_eq!(stats["subjectProgress"][0]["subjectId"], subject_id);
    assert_eq!(stats["subjectProgress"][0]["accuracy"], 50);
    assert!(!stats["recentBadges"].as_array().unwrap().is_empty());

    let achievements: serde_json::Value = client
        .get(&format!("{}/api/achievements", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let first_steps = achievements["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "First Steps")
        .expect("seeded badge listed");
    assert_eq!(first_steps["isEarned"], true);
    assert_eq!(first_steps["progress"], 100);
    assert_eq!(achievements["userStats"]["totalXp"], 10);
    assert_eq!(achievements["userStats"]["testsCompleted"], 1);
}

#[tokio::test]
async fn resubmitted_answers_overwrite_previous_ones() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&app, &client, &unique_email()).await;
    let subject_id = seed_subject(&app.pool).await;
    let question_id = seed_question(&app.pool, subject_id, 1).await;

    for selected in [1, 2] {
        let response = submit(
            &app,
            &client,
            &token,
            serde_json::json!({ "subjectId": subject_id, "answers": [answer(question_id, selected)] }),
        )
        .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    // Duplicates inside one batch: the last one counts.
    let response = submit(
        &app,
        &client,
        &token,
        serde_json::json!({
            "subjectId": subject_id,
            "answers": [answer(question_id, 1), answer(question_id, 3)]
        }),
    )
    .await;
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["totalQuestions"], 1);
    assert_eq!(result["correctAnswers"], 0);

    let rows = sqlx::query_as::<_, StoredAnswer>(
        "SELECT selected_option, is_correct FROM user_answers WHERE question_id = $1",
    )
    .bind(question_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].selected_option, 3);
    assert!(!rows[0].is_correct);
}

#[tokio::test]
async fn badges_are_awarded_once() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&app, &client, &unique_email()).await;
    let subject_id = seed_subject(&app.pool).await;
    let question_id = seed_question(&app.pool, subject_id, 1).await;

    let badge_name = format!("Badge {}", uuid::Uuid::new_v4());
    let badge_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO badges (name, description, icon, color, category, xp_required)
        VALUES ($1, 'Test badge', 'star', '#fff', 'special', 10)
        RETURNING id
        "#,
    )
    .bind(&badge_name)
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let body = serde_json::json!({ "subjectId": subject_id, "answers": [answer(question_id, 1)] });

    let first: serde_json::Value = submit(&app, &client, &token, body.clone())
        .await
        .json()
        .await
        .unwrap();
    assert!(badge_names(&first).contains(&badge_name));

    let second: serde_json::Value = submit(&app, &client, &token, body).await.json().await.unwrap();
    assert_eq!(second["totalXp"], 20);
    assert!(!badge_names(&second).contains(&badge_name));

    let holders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_badges WHERE badge_id = $1")
            .bind(badge_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(holders, 1);
}

#[tokio::test]
async fn submit_rejects_bad_batches() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&app, &client, &unique_email()).await;
    let subject_id = seed_subject(&app.pool).await;
    let other_subject = seed_subject(&app.pool).await;
    let foreign_question = seed_question(&app.pool, other_subject, 0).await;

    let empty = submit(
        &app,
        &client,
        &token,
        serde_json::json!({ "subjectId": subject_id, "answers": [] }),
    )
    .await;
    assert_eq!(empty.status().as_u16(), 400);

    let foreign = submit(
        &app,
        &client,
        &token,
        serde_json::json!({ "subjectId": subject_id, "answers": [answer(foreign_question, 0)] }),
    )
    .await;
    assert_eq!(foreign.status().as_u16(), 400);

    // Index 4 is past the last of four options.
    let own_question = seed_question(&app.pool, subject_id, 1).await;
    let past_last = submit(
        &app,
        &client,
        &token,
        serde_json::json!({ "subjectId": subject_id, "answers": [answer(own_question, 4)] }),
    )
    .await;
    assert_eq!(past_last.status().as_u16(), 400);

    let unknown = submit(
        &app,
        &client,
        &token,
        serde_json::json!({ "subjectId": subject_id, "answers": [answer(i64::MAX, 0)] }),
    )
    .await;
    assert_eq!(unknown.status().as_u16(), 404);

    let unauthenticated = client
        .post(&format!("{}/api/test/submit", app.address))
        .json(&serde_json::json!({ "subjectId": subject_id, "answers": [answer(foreign_question, 0)] }))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthenticated.status().as_u16(), 401);

    // Nothing was stored for the rejected batches.
    let me: serde_json::Value = client
        .get(&format!("{}/api/user/current", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["xp"], 0);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_answers WHERE user_id = $1")
        .bind(me["id"].as_i64().unwrap())
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}
