//! Minimal HTML pages for the segment and invitation screens.

use crate::models::{Invitation, Segment, SegmentSummary};

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}</body></html>\n",
        title = escape(title),
    )
}

pub fn segment_index(segments: &[SegmentSummary]) -> String {
    let mut body = String::from("<p><a href=\"/segments/create\">New Segment</a></p>\n");
    if segments.is_empty() {
        body.push_str("<p>You have not created any segments.</p>\n");
    } else {
        body.push_str("<table>\n<tr><th>Name</th><th>Subscribers</th><th></th></tr>\n");
        for summary in segments {
            body.push_str(&format!(
                "<tr><td>{name}</td><td>{count}</td><td><a href=\"/segments/{id}/edit\">Edit</a></td></tr>\n",
                name = escape(&summary.segment.name),
                count = summary.subscriber_count,
                id = summary.segment.id,
            ));
        }
        body.push_str("</table>\n");
    }
    layout("Segments", &body)
}

/// Create form when `segment` is `None`, edit form otherwise.
pub fn segment_form(segment: Option<&Segment>) -> String {
    let (title, action, method_field, name) = match segment {
        Some(s) => (
            "Edit Segment",
            format!("/segments/{}", s.id),
            "<input type=\"hidden\" name=\"_method\" value=\"PUT\">\n",
            s.name.as_str(),
        ),
        None => ("New Segment", "/segments".to_string(), "", ""),
    };
    let body = format!(
        "<form method=\"post\" action=\"{action}\">\n\
         {method_field}\
         <label for=\"name\">Name</label>\n\
         <input id=\"name\" name=\"name\" maxlength=\"255\" value=\"{name}\">\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n",
        name = escape(name),
    );
    layout(title, &body)
}

pub fn invitation_index(invitations: &[Invitation]) -> String {
    let mut body = String::from(
        "<form method=\"post\" action=\"/workspaces/invitations\">\n\
         <input name=\"email\" type=\"email\"><button type=\"submit\">Invite</button>\n\
         </form>\n<ul>\n",
    );
    for invitation in invitations {
        body.push_str(&format!(
            "<li>{email} ({role})</li>\n",
            email = escape(&invitation.email),
            role = escape(&invitation.role),
        ));
    }
    body.push_str("</ul>\n");
    layout("Invitations", &body)
}
