use axum::{Extension, extract::Query, response::Html};

use crate::{spotify::auth::SharedHandshake, types::CallbackParams, warning};

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(handshake): Extension<SharedHandshake>,
) -> Html<String> {
    let mut controller = handshake.lock().await;

    match controller.handle_callback(&params).await {
        Ok(_) => Html(
            "<h2>Authentication successful.</h2><p>Close this browser window.</p>".to_string(),
        ),
        Err(e) => {
            warning!("Authentication failed: {}", e);
            Html(format!(
                "<h2>Authentication failed.</h2><p>{}</p><p>Run <code>spotlyze auth</code> to try again.</p>",
                escape_html(&e.user_message())
            ))
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
