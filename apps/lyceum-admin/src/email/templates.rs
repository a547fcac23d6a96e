//! Email templates for invitations.

/// Content for invitation emails.
pub struct InvitationEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl InvitationEmailContent {
    /// Build the invitation email for a receiver.
    pub fn new(site: &str, realname: &str, url: &str, message: Option<&str>) -> Self {
        Self {
            subject: format!("You're invited to join {}", site),
            text: Self::text_template(site, realname, url, message),
            html: Self::html_template(site, realname, url, message),
        }
    }

    fn text_template(site: &str, realname: &str, url: &str, message: Option<&str>) -> String {
        let note = match message {
            Some(m) => format!("\n{}\n", m),
            None => String::new(),
        };
        format!(
            r#"Hello {realname},

You have been invited to join {site}.
{note}
Accept your invitation here:

    {url}

If you weren't expecting this invitation, you can ignore this email."#,
        )
    }

    fn html_template(site: &str, realname: &str, url: &str, message: Option<&str>) -> String {
        let note = match message {
            Some(m) => format!("<p>{}</p>", m),
            None => String::new(),
        };
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 40px 20px; }}
        .card {{ background: white; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #1a1a1a; margin-top: 0; font-size: 24px; }}
        .button {{ display: inline-block; padding: 12px 28px; background: #2563eb; color: #fff; border-radius: 6px; text-decoration: none; font-weight: bold; }}
        .footer {{ margin-top: 32px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <h1>You're invited to join {site}</h1>
            <p>Hello {realname},</p>
            {note}
            <p><a class="button" href="{url}">Accept invitation</a></p>
            <div class="footer">
                <p>If you weren't expecting this invitation, you can ignore this email.</p>
            </div>
        </div>
    </div>
</body>
</html>"#,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_contains_the_redemption_url() {
        let content = InvitationEmailContent::new(
            "campus.example.com",
            "Ricky",
            "https://campus.example.com/invitations/accept?scode=token",
            None,
        );
        assert!(content.text.contains("scode=token"));
        assert!(content.html.contains("scode=token"));
    }

    #[test]
    fn subject_names_the_site() {
        let content = InvitationEmailContent::new("campus.example.com", "Ricky", "https://x", None);
        assert_eq!(content.subject, "You're invited to join campus.example.com");
    }

    #[test]
    fn optional_message_is_included() {
        let content = InvitationEmailContent::new(
            "campus.example.com",
            "Ricky",
            "https://x",
            Some("See you in class!"),
        );
        assert!(content.text.contains("See you in class!"));
        assert!(content.html.contains("See you in class!"));
    }
}
