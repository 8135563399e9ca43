//! Inline HTML for the authorization login form and error pages

/// Hidden values the login form must echo back unchanged on submission
pub struct LoginFormValues<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub response_type: &'a str,
    pub scope: &'a str,
    pub state: Option<&'a str>,
    pub code_challenge: Option<&'a str>,
}

/// Login form shown for a valid authorization request
pub fn login_page(values: &LoginFormValues) -> String {
    let mut hidden = format!(
        r#"<input type="hidden" name="client_id" value="{}">
            <input type="hidden" name="redirect_uri" value="{}">
            <input type="hidden" name="response_type" value="{}">
            <input type="hidden" name="scope" value="{}">"#,
        html_escape(values.client_id),
        html_escape(values.redirect_uri),
        html_escape(values.response_type),
        html_escape(values.scope),
    );
    if let Some(state) = values.state {
        hidden.push_str(&format!(
            "\n            <input type=\"hidden\" name=\"state\" value=\"{}\">",
            html_escape(state)
        ));
    }
    if let Some(challenge) = values.code_challenge {
        hidden.push_str(&format!(
            "\n            <input type=\"hidden\" name=\"code_challenge\" value=\"{}\">",
            html_escape(challenge)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Authorization</title>
    <style>{}</style>
</head>
<body>
    <div class="container">
        <h1>Authorization</h1>
        <form action="/authorize" method="POST">
            <div class="field">
                <label for="username">Username</label>
                <input type="text" id="username" name="username" required>
            </div>
            <div class="field">
                <label for="password">Password</label>
                <input type="password" id="password" name="password" required>
            </div>
            <button type="submit">Login</button>
            {}
        </form>
    </div>
</body>
</html>"#,
        CSS_STYLES, hidden
    )
}

/// Bare error page for requests that never reach a redirect
pub fn error_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>{}</style>
</head>
<body>
    <div class="container">
        <h1>{}</h1>
        <p>{}</p>
    </div>
</body>
</html>"#,
        html_escape(title),
        CSS_STYLES,
        html_escape(title),
        html_escape(message)
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

const CSS_STYLES: &str = r#"
* {
    box-sizing: border-box;
}
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #f4f4f5;
    color: #18181b;
    margin: 0;
    padding: 24px;
    min-height: 100vh;
    display: flex;
    align-items: center;
    justify-content: center;
}
.container {
    background: #fff;
    padding: 32px;
    border-radius: 8px;
    max-width: 360px;
    width: 100%;
    border: 1px solid #e4e4e7;
}
h1 {
    margin: 0 0 16px 0;
    font-size: 20px;
}
p {
    color: #52525b;
    margin: 0;
    line-height: 1.5;
}
.field {
    margin-bottom: 16px;
}
label {
    display: block;
    margin-bottom: 6px;
    font-size: 14px;
}
input {
    width: 100%;
    padding: 10px;
    border: 1px solid #d4d4d8;
    border-radius: 4px;
    font-size: 15px;
}
input:focus {
    outline: none;
    border-color: #2563eb;
}
button {
    display: block;
    width: 100%;
    padding: 12px;
    background: #2563eb;
    color: #fff;
    border: none;
    border-radius: 4px;
    font-size: 15px;
    cursor: pointer;
}
button:hover {
    background: #1d4ed8;
}
"#;
