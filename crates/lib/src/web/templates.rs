//! HTML pages shown to users at the end of a connect or disconnect.
//!
//! Simple inline HTML templates without a template engine.

use crate::handshake::{Confirmation, Disconnection};

/// Common CSS styles for all pages
const COMMON_STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
        max-width: 640px;
        margin: 40px auto;
        padding: 0 20px;
        background: #f5f5f5;
    }
    .container {
        background: white;
        padding: 30px;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    h1 {
        color: #333;
        border-bottom: 2px solid #0066cc;
        padding-bottom: 10px;
    }
    .info-row {
        margin: 10px 0;
        padding: 8px;
        background: #f9f9f9;
        border-radius: 4px;
    }
    .label {
        font-weight: bold;
        color: #666;
        display: inline-block;
        width: 150px;
    }
    .value {
        color: #0066cc;
    }
    button {
        background: #999;
        color: white;
        padding: 10px 20px;
        border: none;
        border-radius: 4px;
        cursor: pointer;
        font-size: 14px;
        font-weight: bold;
    }
    button:hover {
        background: #777;
    }
"#;

/// Render the page shown after a successful handshake
pub fn connected_page(confirmation: &Confirmation) -> String {
    let host_name = html_escape(&confirmation.host_display_name);
    let tracker_name = html_escape(&confirmation.tracker_display);
    let instance_url = html_escape(confirmation.instance_url.as_str());
    let disconnect_url = html_escape(confirmation.disconnect_url.as_str());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Tracker account connected</title>
    <style>{COMMON_STYLES}</style>
</head>
<body>
    <div class="container">
        <h1>Account connected</h1>
        <p>{host_name}, your account is now connected to the issue tracker.</p>
        <div class="info-row"><span class="label">Tracker user:</span> <span class="value">{tracker_name}</span></div>
        <div class="info-row"><span class="label">Tracker:</span> <span class="value">{instance_url}</span></div>
        <p>You can close this window.</p>
        <form method="POST" action="{disconnect_url}">
            <button type="submit">Disconnect</button>
        </form>
    </div>
</body>
</html>"#
    )
}

/// Render the page shown after a link is removed
pub fn disconnected_page(disconnection: &Disconnection) -> String {
    let host_name = html_escape(&disconnection.host_display_name);
    let tracker_name = html_escape(&disconnection.tracker_display);
    let instance_url = html_escape(disconnection.instance_url.as_str());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Tracker account disconnected</title>
    <style>{COMMON_STYLES}</style>
</head>
<body>
    <div class="container">
        <h1>Account disconnected</h1>
        <p>{host_name}, your account is no longer connected to {tracker_name} on {instance_url}.</p>
        <p>You can close this window.</p>
    </div>
</body>
</html>"#
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
