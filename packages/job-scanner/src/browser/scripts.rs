//! Page scripts evaluated by the Chrome driver.
//!
//! Every script runs inside a try/catch envelope and returns a JSON string
//! `{"ok": true, "value": ...}` or `{"ok": false, "error": "..."}`, so page
//! exceptions come back as data instead of protocol failures. Arguments are
//! embedded as JSON literals.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::Scope;
use crate::error::{BrowserError, BrowserResult};

const PRELUDE: &str = r#"
const __root = (scope) => {
  if (scope === null) return document;
  const frame = document.querySelectorAll('iframe, frame')[scope];
  if (!frame) throw new Error('frame ' + scope + ' not found');
  const doc = frame.contentDocument;
  if (!doc || !doc.body) throw new Error('frame ' + scope + ' not accessible');
  return doc;
};
const __visible = (el) => {
  const rect = el.getBoundingClientRect();
  const view = el.ownerDocument.defaultView || window;
  const style = view.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0 &&
    style.visibility !== 'hidden' && style.display !== 'none';
};
const __key = (el) => {
  if (!el) return '';
  let cls = typeof el.className === 'string' ? el.className.trim() : '';
  if (cls.startsWith('"')) cls = cls.slice(1, -1);
  if (cls) return '.' + cls.split(/\s+/).join('.');
  return el.tagName ? el.tagName.trim() : '';
};
const __text = (el) => (el.textContent || '').toLowerCase().trim();
"#;

fn wrap(body: &str) -> String {
    let mut script = String::from("(() => {");
    script.push_str(PRELUDE);
    script.push_str("try { const value = (() => {");
    script.push_str(body);
    script.push_str(
        "})(); return JSON.stringify({ ok: true, value: value === undefined ? null : value }); } \
         catch (e) { return JSON.stringify({ ok: false, error: String((e && e.message) || e) }); } })()",
    );
    script
}

fn scope_arg(scope: Scope) -> String {
    match scope {
        Scope::Main => "null".to_string(),
        Scope::Frame(index) => index.to_string(),
    }
}

fn string_arg(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub fn accept_cookies() -> String {
    wrap(
        r#"
        const button = Array.from(document.querySelectorAll('button'))
          .find((b) => (b.textContent || '').trim().toLowerCase() === 'accept all');
        if (button) { button.click(); return true; }
        return false;
        "#,
    )
}

pub fn scroll_by(delta_y: i64) -> String {
    wrap(&format!("window.scrollBy(0, {delta_y}); return true;"))
}

pub fn go_back() -> String {
    wrap("history.back(); return true;")
}

pub fn frames() -> String {
    wrap(
        r#"
        return Array.from(document.querySelectorAll('iframe, frame')).map((f, index) => {
          let url = f.src || '';
          if (!url) {
            try { url = f.contentWindow.location.href; } catch (e) { url = ''; }
          }
          return { index, url };
        });
        "#,
    )
}

pub fn controls(scope: Scope) -> String {
    wrap(&format!(
        r#"
        const root = __root({scope});
        return Array.from(root.querySelectorAll('a, button')).map((el, index) => ({{
          index,
          tag: el.tagName.toLowerCase(),
          text: __text(el),
          href: el.getAttribute('href'),
          target: el.getAttribute('target'),
          visible: __visible(el),
        }}));
        "#,
        scope = scope_arg(scope)
    ))
}

pub fn click_control(scope: Scope, index: usize, expected_text: &str) -> String {
    wrap(&format!(
        r#"
        const el = __root({scope}).querySelectorAll('a, button')[{index}];
        if (!el || __text(el) !== {expected}) return false;
        el.scrollIntoView({{ block: 'center' }});
        el.click();
        return true;
        "#,
        scope = scope_arg(scope),
        expected = string_arg(expected_text)
    ))
}

pub fn text_groups(scope: Scope) -> String {
    wrap(&format!(
        r#"
        const root = __root({scope});
        const body = root.body;
        if (!body) return [];
        const groups = new Map();
        for (const el of body.querySelectorAll('h1, h2, h3, h4, h5, p, a, span, div, td')) {{
          let text = '';
          for (const node of el.childNodes) {{
            if (node.nodeType === Node.TEXT_NODE) text += node.textContent.trim();
          }}
          if (text === '') continue;
          const parentKey = __key(el.parentElement);
          const ownKey = __key(el);
          const key = parentKey ? parentKey + ' > ' + ownKey : ownKey;
          const attributes = {{}};
          for (const attr of el.attributes) attributes[attr.name] = attr.value;
          if (!groups.has(key)) groups.set(key, []);
          groups.get(key).push({{ text: text.trim(), attributes }});
        }}
        return Array.from(groups.entries()).map(([key, elements]) => ({{ key, elements }}));
        "#,
        scope = scope_arg(scope)
    ))
}

pub fn select(scope: Scope, selector: &str) -> String {
    wrap(&format!(
        r#"
        const root = __root({scope});
        return Array.from(root.querySelectorAll({selector})).map((el) => {{
          const attributes = {{}};
          let shown = true;
          for (const attr of el.attributes) {{
            if (['display', 'opacity', 'visibility'].includes(attr.name) && attr.value === 'none') shown = false;
            if (!['href', 'class'].includes(attr.name)) attributes[attr.name] = attr.value;
          }}
          return {{
            text: (el.textContent || '').trim(),
            href: el.getAttribute('href'),
            attributes,
            shown,
          }};
        }});
        "#,
        scope = scope_arg(scope),
        selector = string_arg(selector)
    ))
}

pub fn probe_levels(scope: Scope, selector: &str, index: usize, max_depth: usize) -> String {
    wrap(&format!(
        r#"
        let el = __root({scope}).querySelectorAll({selector})[{index}];
        const levels = [];
        for (let depth = 0; el && depth <= {max_depth}; depth++) {{
          const items = Array.from(el.querySelectorAll('a, button'));
          items.push(el);
          const level = el;
          levels.push({{
            depth,
            controls: items.map((c, position) => ({{
              position,
              tag: c.tagName.toLowerCase(),
              text: (c.textContent || '').toLowerCase(),
              href: c.getAttribute('href'),
              visible: __visible(c),
              is_level_element: c === level,
            }})),
          }});
          el = el.parentElement;
        }}
        return levels;
        "#,
        scope = scope_arg(scope),
        selector = string_arg(selector),
    ))
}

pub fn click_probe(
    scope: Scope,
    selector: &str,
    index: usize,
    depth: usize,
    position: usize,
) -> String {
    wrap(&format!(
        r#"
        let el = __root({scope}).querySelectorAll({selector})[{index}];
        for (let d = 0; el && d < {depth}; d++) el = el.parentElement;
        if (!el) return false;
        const items = Array.from(el.querySelectorAll('a, button'));
        items.push(el);
        const target = items[{position}];
        if (!target) return false;
        target.scrollIntoView({{ block: 'center' }});
        target.click();
        return true;
        "#,
        scope = scope_arg(scope),
        selector = string_arg(selector),
    ))
}

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    error: Option<String>,
}

/// Decode the value a wrapped script returned.
pub fn decode<T: DeserializeOwned>(raw: Option<&serde_json::Value>) -> BrowserResult<T> {
    let text = match raw {
        Some(serde_json::Value::String(text)) => text,
        other => {
            return Err(BrowserError::Script(format!(
                "script returned {other:?} instead of a JSON string"
            )))
        }
    };

    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| BrowserError::Script(format!("unreadable script result: {e}")))?;

    if !envelope.ok {
        return Err(BrowserError::Script(
            envelope.error.unwrap_or_else(|| "unknown page error".to_string()),
        ));
    }

    serde_json::from_value(envelope.value)
        .map_err(|e| BrowserError::Script(format!("unexpected script result shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Control;

    #[test]
    fn arguments_are_embedded_as_json_literals() {
        let script = select(Scope::Frame(2), "div[data-x=\"a'b\"]");
        assert!(script.contains("__root(2)"));
        assert!(script.contains(r#""div[data-x=\"a'b\"]""#));

        let script = controls(Scope::Main);
        assert!(script.contains("__root(null)"));
    }

    #[test]
    fn decode_reads_successful_envelopes() {
        let raw = serde_json::Value::String(
            r#"{"ok":true,"value":[{"index":0,"tag":"a","text":"view jobs","href":"/jobs","target":null,"visible":true}]}"#
                .to_string(),
        );
        let controls: Vec<Control> = decode(Some(&raw)).unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].href.as_deref(), Some("/jobs"));
    }

    #[test]
    fn decode_surfaces_page_errors() {
        let raw = serde_json::Value::String(
            r#"{"ok":false,"error":"frame 1 not accessible"}"#.to_string(),
        );
        let err = decode::<bool>(Some(&raw)).unwrap_err();
        assert!(err.to_string().contains("frame 1 not accessible"));
    }

    #[test]
    fn decode_rejects_non_string_results() {
        assert!(decode::<bool>(None).is_err());
        assert!(decode::<bool>(Some(&serde_json::Value::Bool(true))).is_err());
    }
}
