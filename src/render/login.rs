use chrono::{Datelike, Utc};

use super::{Message, escape, footer, head, messages};

pub fn render_login(logo: &str, flash: &[Message]) -> String {
    let mut page = head(logo);
    page.push_str(&format!(
        "<nav><span class=\"brand\">{}</span></nav>\n<main class=\"login\">\n",
        escape(logo)
    ));
    page.push_str(&messages(flash));
    page.push_str(
        "<form method=\"post\" action=\"/login\">\n\
         <label for=\"username\">Username</label>\n\
         <input type=\"text\" id=\"username\" name=\"username\" autocomplete=\"username\" required autofocus>\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" autocomplete=\"current-password\" required>\n\
         <button type=\"submit\">Sign in</button>\n\
         </form>\n</main>\n",
    );
    page.push_str(&footer(logo, Utc::now().year()));
    page
}
