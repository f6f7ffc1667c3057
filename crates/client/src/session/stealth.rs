//! Navigator fingerprint overrides injected before any page script runs.

/// Language list advertised by `navigator.languages`, derived from an
/// `Accept-Language` header value (quality weights dropped).
pub fn languages(accept_language: &str) -> Vec<String> {
    let langs: Vec<String> = accept_language
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect();
    if langs.is_empty() { vec!["en-US".to_string(), "en".to_string()] } else { langs }
}

/// Script hiding the automation flag and filling in the plugin and language
/// lists a headless browser leaves empty.
pub fn stealth_script(accept_language: &str) -> String {
    let langs = serde_json::to_string(&languages(accept_language)).unwrap_or_else(|_| "[\"en-US\"]".into());
    format!(
        r#"(() => {{
  Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
  Object.defineProperty(navigator, 'plugins', {{
    get: () => [
      {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer' }},
      {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer' }},
      {{ name: 'Chromium PDF Viewer', filename: 'internal-pdf-viewer' }},
    ],
  }});
  Object.defineProperty(navigator, 'languages', {{ get: () => {langs} }});
  window.chrome = window.chrome || {{ runtime: {{}} }};
}})();"#
    )
}
