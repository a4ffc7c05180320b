use axum::http::{Method, StatusCode};
use serde_json::json;

use super::*;
use crate::test_support::{drain, signed_out_client, FakeRepository, MockService};

#[tokio::test]
async fn new_client_starts_signed_out() {
    let repo = Arc::new(FakeRepository::new());
    let client = signed_out_client(Role::Customer, &repo);

    assert!(!client.session().is_active().await);
    assert_eq!(client.role(), Role::Customer);
    assert_eq!(client.store().snapshot().await, StoreSnapshot::default());
    assert_eq!(client.coordinator().pending_delete().await, None);
}

#[tokio::test]
async fn workflows_share_the_client_event_stream() {
    let repo = Arc::new(FakeRepository::new());
    let client = signed_out_client(Role::CompanyAdmin, &repo);
    let mut rx = client.subscribe_events();

    client
        .confirmation_workflow()
        .request(shared::domain::AppointmentId::new("A1"))
        .await;

    assert_eq!(drain(&mut rx), vec![ClientEvent::NoticesCleared]);
}

#[tokio::test]
async fn admin_dashboard_round_trip_over_http() {
    let mock = MockService::spawn().await;
    mock.reply(
        Method::POST,
        "/api/auth/login",
        StatusCode::OK,
        json!({ "token": "jwt-admin" }).to_string(),
    )
    .await;
    mock.reply(
        Method::GET,
        "/api/company-admin/appointments",
        StatusCode::OK,
        json!([{
            "id": "3f2a9c1e-77aa-4b0e-9d1c-0c8f2c7e1a55",
            "date": "2030-01-01T10:00:00",
            "status": "Pending",
            "customerFullName": "Ayşe Yılmaz"
        }])
        .to_string(),
    )
    .await;
    let settings = ClientSettings {
        server_url: mock.url.clone(),
        ..ClientSettings::default()
    };
    let client = AppointmentClient::new(&settings, Role::CompanyAdmin);
    let mut rx = client.subscribe_events();

    AuthClient::new(&settings.server_url)
        .login(
            &Credentials {
                email: "admin@acme.test".into(),
                password: "hunter2".into(),
                role: Role::CompanyAdmin,
            },
            client.session(),
        )
        .await
        .expect("login");
    let (appointments, companies) = client.store().load().await.expect("load");
    assert_eq!(appointments.len(), 1);
    assert!(companies.is_empty());

    let id = appointments[0].id.clone();
    client
        .coordinator()
        .update_status(&id, "Confirmed")
        .await
        .expect("update");

    let requests = mock.requests().await;
    let paths: Vec<(Method, &str)> = requests
        .iter()
        .map(|request| (request.method.clone(), request.path.as_str()))
        .collect();
    assert_eq!(
        paths,
        vec![
            (Method::POST, "/api/auth/login"),
            (Method::GET, "/api/company-admin/appointments"),
            (Method::PUT, "/api/company-admin/appointments/update"),
            (Method::GET, "/api/company-admin/appointments"),
        ]
    );
    assert!(requests[1..]
        .iter()
        .all(|request| request.authorization.as_deref() == Some("Bearer jwt-admin")));

    let notices: Vec<Notice> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ClientEvent::Notice(notice) => Some(notice),
            _ => None,
        })
        .collect();
    assert_eq!(
        notices,
        vec![Notice::success(
            "Appointment (3f2a9c1e...) status was updated to \"Confirmed\"."
        )]
    );
}
