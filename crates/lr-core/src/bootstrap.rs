//! Client bootstrap script.
//!
//! The script is prefixed to emitted entry code when `append_script_tag` is
//! enabled. It opens a WebSocket to the reload channel and refreshes the page
//! when a `reload` message arrives; stylesheet-only changes swap the
//! `<link>` tags in place instead of reloading.

/// Path of the reload channel endpoint.
pub const RELOAD_PATH: &str = "/livereload";

/// Parameters of the bootstrap script.
#[derive(Clone, Copy, Debug)]
pub struct ClientScript<'a> {
    /// Per-plugin id, keeps several instances from installing twice.
    pub instance_id: &'a str,
    /// Host to connect to (`None` uses `location.hostname`).
    pub hostname: Option<&'a str>,
    /// `http`, `https`, `ws`, `wss` or empty to follow the page.
    pub protocol: &'a str,
    /// Port of the reload channel.
    pub port: u16,
}

impl ClientScript<'_> {
    /// Render the script.
    #[must_use]
    pub fn render(&self) -> String {
        let scheme = match self.protocol {
            "" => r#"(location.protocol === "https:" ? "wss:" : "ws:")"#.to_owned(),
            "https" | "wss" => r#""wss:""#.to_owned(),
            _ => r#""ws:""#.to_owned(),
        };
        let host = self
            .hostname
            .map_or_else(|| "location.hostname".to_owned(), js_string);

        format!(
            r#"
// lr live reload
(function() {{
  if (typeof window === "undefined") {{ return; }}
  var id = "lr-live-reload-{id}";
  if (window[id]) {{ return; }}
  window[id] = true;
  var url = {scheme} + "//" + {host} + ":{port}{path}";
  var socket = new WebSocket(url);
  socket.onmessage = function(event) {{
    var message = JSON.parse(event.data);
    if (message.command !== "reload") {{ return; }}
    var cssOnly = message.files.length > 0 && message.files.every(function(file) {{
      return /\.css$/.test(file);
    }});
    if (!cssOnly) {{ window.location.reload(); return; }}
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function(link) {{
      var href = link.href.replace(/[?&]lr=\d+/, "");
      link.href = href + (href.indexOf("?") === -1 ? "?" : "&") + "lr=" + Date.now();
    }});
  }};
  console.log("[Live Reload] enabled");
}}());
"#,
            id = self.instance_id,
            port = self.port,
            path = RELOAD_PATH,
        )
    }
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003c"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
