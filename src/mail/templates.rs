//! HTML bodies for outgoing mail. Plain string rendering; the layout is a
//! single centered card shared by every message.

fn layout(title: &str, inner: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><body style=\"margin:0;padding:0;background:#f4f4f4\">\
         <div style=\"max-width:520px;margin:24px auto;padding:24px;\
         background:#ffffff;font-family:sans-serif;color:#333333\">\
         <h2 style=\"margin-top:0\">Doable</h2>\
         <h3>{title}</h3>\
         {inner}\
         </div></body></html>"
    )
}

pub fn activation(full_name: &str, activation_url: &str) -> String {
    layout(
        "Activate Your Account",
        &format!(
            "<p>Hello, {full_name}</p>\
             <p><a href=\"{activation_url}\">Activate Your Account</a></p>"
        ),
    )
}

pub fn forgot_password(full_name: &str, reset_url: &str) -> String {
    layout(
        "Forgot Password",
        &format!(
            "<p>Hello, {full_name}</p>\
             <p><a href=\"{reset_url}\">Set New Password</a></p>"
        ),
    )
}

pub fn reminder(full_name: &str, task_title: &str) -> String {
    layout(
        "Reminder",
        &format!(
            "<p>Hello, {full_name}</p>\
             <p>It's time for the task.</p>\
             <p><strong>'{task_title}'</strong></p>"
        ),
    )
}

pub fn contact(full_name: &str, email: &str, message: &str) -> String {
    layout(
        "New Contact",
        &format!(
            "<p>{full_name} &lt;{email}&gt; wrote:</p>\
             <blockquote>{message}</blockquote>"
        ),
    )
}
