//! # Server-rendered HTML pages
//!
//! Every page is the base layout wrapped around a page-specific `<main>`
//! section. All user-supplied values go through [`html_escape`] before they are
//! interpolated.

use crate::db::models::Snippet;
use crate::forms::{SnippetCreateForm, UserLoginForm, UserSignupForm, EXPIRY_OPTIONS};
use crate::middleware::csrf::CSRF_FORM_FIELD;
use crate::validator::Validator;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Data every page needs, independent of what the page shows
#[derive(Debug, Clone)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

pub fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a timestamp as "02 Jan 2006 at 15:04" (UTC); empty when unknown
pub fn human_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%d %b %Y at %H:%M").to_string())
        .unwrap_or_default()
}

pub fn home(data: &TemplateData, snippets: &[Snippet]) -> String {
    let mut main = String::from("<h2>Latest Snippets</h2>\n");

    if snippets.is_empty() {
        main.push_str("<p>There's nothing to see here... yet!</p>\n");
    } else {
        main.push_str("<table>\n<tr><th>Title</th><th>Created</th><th>ID</th></tr>\n");
        for snippet in snippets {
            let _ = writeln!(
                main,
                "<tr><td><a href=\"/snippet/view/{id}\">{title}</a></td><td>{created}</td><td>#{id}</td></tr>",
                id = snippet.id,
                title = html_escape(&snippet.title),
                created = human_date(snippet.created_at()),
            );
        }
        main.push_str("</table>\n");
    }

    layout("Home", data, &main)
}

pub fn view(data: &TemplateData, snippet: &Snippet) -> String {
    let main = format!(
        "<div class=\"snippet\">\n\
         <div class=\"metadata\"><strong>{title}</strong><span>#{id}</span></div>\n\
         <pre><code>{content}</code></pre>\n\
         <div class=\"metadata\"><time>Created: {created}</time><time>Expires: {expires}</time></div>\n\
         </div>\n",
        title = html_escape(&snippet.title),
        id = snippet.id,
        content = html_escape(&snippet.content),
        created = human_date(snippet.created_at()),
        expires = human_date(snippet.expires_at()),
    );

    layout(&format!("Snippet #{}", snippet.id), data, &main)
}

pub fn create(data: &TemplateData, form: &SnippetCreateForm) -> String {
    let v = &form.validator;
    let mut main = String::new();

    main.push_str("<form action=\"/snippet/create\" method=\"POST\">\n");
    main.push_str(&csrf_field(data));
    let _ = write!(
        main,
        "<div>\n<label>Title:</label>\n{error}<input type=\"text\" name=\"title\" value=\"{title}\">\n</div>\n",
        error = field_error(v, "title"),
        title = html_escape(&form.title),
    );
    let _ = write!(
        main,
        "<div>\n<label>Content:</label>\n{error}<textarea name=\"content\">{content}</textarea>\n</div>\n",
        error = field_error(v, "content"),
        content = html_escape(&form.content),
    );

    main.push_str("<div>\n<label>Delete in:</label>\n");
    main.push_str(&field_error(v, "expires"));
    for days in EXPIRY_OPTIONS {
        let label = match days {
            1 => "One Day",
            7 => "One Week",
            _ => "One Year",
        };
        let checked = if form.expires == days { " checked" } else { "" };
        let _ = writeln!(
            main,
            "<input type=\"radio\" name=\"expires\" value=\"{days}\"{checked}> {label}"
        );
    }
    main.push_str("</div>\n");
    main.push_str("<div>\n<input type=\"submit\" value=\"Publish snippet\">\n</div>\n</form>\n");

    layout("Create a New Snippet", data, &main)
}

pub fn signup(data: &TemplateData, form: &UserSignupForm) -> String {
    let v = &form.validator;
    let mut main = String::new();

    main.push_str("<form action=\"/user/signup\" method=\"POST\" novalidate>\n");
    main.push_str(&csrf_field(data));
    let _ = write!(
        main,
        "<div>\n<label>Name:</label>\n{error}<input type=\"text\" name=\"name\" value=\"{name}\">\n</div>\n",
        error = field_error(v, "name"),
        name = html_escape(&form.name),
    );
    let _ = write!(
        main,
        "<div>\n<label>Email:</label>\n{error}<input type=\"email\" name=\"email\" value=\"{email}\">\n</div>\n",
        error = field_error(v, "email"),
        email = html_escape(&form.email),
    );
    let _ = write!(
        main,
        "<div>\n<label>Password:</label>\n{error}<input type=\"password\" name=\"password\">\n</div>\n",
        error = field_error(v, "password"),
    );
    main.push_str("<div>\n<input type=\"submit\" value=\"Signup\">\n</div>\n</form>\n");

    layout("Signup", data, &main)
}

pub fn login(data: &TemplateData, form: &UserLoginForm) -> String {
    let v = &form.validator;
    let mut main = String::new();

    main.push_str("<form action=\"/user/login\" method=\"POST\" novalidate>\n");
    main.push_str(&csrf_field(data));
    for error in &v.non_field_errors {
        let _ = writeln!(main, "<div class=\"error\">{}</div>", html_escape(error));
    }
    let _ = write!(
        main,
        "<div>\n<label>Email:</label>\n{error}<input type=\"email\" name=\"email\" value=\"{email}\">\n</div>\n",
        error = field_error(v, "email"),
        email = html_escape(&form.email),
    );
    let _ = write!(
        main,
        "<div>\n<label>Password:</label>\n{error}<input type=\"password\" name=\"password\">\n</div>\n",
        error = field_error(v, "password"),
    );
    main.push_str("<div>\n<input type=\"submit\" value=\"Login\">\n</div>\n</form>\n");

    layout("Login", data, &main)
}

fn csrf_field(data: &TemplateData) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
        CSRF_FORM_FIELD,
        html_escape(&data.csrf_token)
    )
}

fn field_error(v: &Validator, key: &str) -> String {
    v.field_error(key)
        .map(|message| format!("<label class=\"error\">{}</label>\n", html_escape(message)))
        .unwrap_or_default()
}

fn nav(data: &TemplateData) -> String {
    let mut nav = String::from("<nav>\n<div>\n<a href=\"/\">Home</a>\n");
    if data.is_authenticated {
        nav.push_str("<a href=\"/snippet/create\">Create snippet</a>\n");
    }
    nav.push_str("</div>\n<div>\n");
    if data.is_authenticated {
        nav.push_str("<form action=\"/user/logout\" method=\"POST\">\n");
        nav.push_str(&csrf_field(data));
        nav.push_str("<button>Logout</button>\n</form>\n");
    } else {
        nav.push_str("<a href=\"/user/signup\">Signup</a>\n<a href=\"/user/login\">Login</a>\n");
    }
    nav.push_str("</div>\n</nav>\n");
    nav
}

fn layout(title: &str, data: &TemplateData, main: &str) -> String {
    let flash = data
        .flash
        .as_deref()
        .map(|flash| format!("<div class=\"flash\">{}</div>\n", html_escape(flash)))
        .unwrap_or_default();

    format!(
        "<!doctype html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title} - Snippetbox</title>\n\
         <link rel=\"stylesheet\" href=\"/static/css/main.css\">\n\
         </head>\n\
         <body>\n\
         <header><h1><a href=\"/\">Snippetbox</a></h1></header>\n\
         {nav}\
         <main>\n{flash}{main}</main>\n\
         <footer>Powered by Rust in {year}</footer>\n\
         </body>\n\
         </html>\n",
        title = html_escape(title),
        nav = nav(data),
        flash = flash,
        main = main,
        year = data.current_year,
    )
}
