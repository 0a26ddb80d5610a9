//! Salesforce session establishment.
//!
//! Two ways to obtain an access token and instance URL:
//! - SOAP `login` with username, password and security token
//! - borrowing the session of an authenticated `sf` CLI org

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::Client;
use tracing::{error, info, instrument};
use url::Url;

use crmreport_shared::{ReportError, Result, SalesforceConfig};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated handle: where the org lives and the bearer token for it.
#[derive(Clone)]
pub struct SalesforceSession {
    pub instance_url: Url,
    pub access_token: String,
}

impl std::fmt::Debug for SalesforceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceSession")
            .field("instance_url", &self.instance_url.as_str())
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Auth modes
// ---------------------------------------------------------------------------

/// Username/password login material.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
    /// Login host prefix ("login" or "test").
    pub domain: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// How the session is obtained.
#[derive(Debug, Clone)]
pub enum SalesforceAuth {
    Credentials(Credentials),
    CliSession { target_org: String },
}

impl SalesforceAuth {
    /// Resolve the auth mode from config, reading secrets from the environment.
    pub fn from_config(config: &SalesforceConfig) -> Result<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// [`SalesforceAuth::from_config`] with an injectable variable lookup.
    pub fn from_config_with(
        config: &SalesforceConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if config.use_cli_session {
            return Ok(Self::CliSession {
                target_org: config.cli_target_org.clone(),
            });
        }

        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let (Some(username), Some(password)) = (
            non_empty(&config.username_env),
            non_empty(&config.password_env),
        ) else {
            return Err(ReportError::config(format!(
                "{} and {} are required when not using CLI session",
                config.username_env, config.password_env
            )));
        };

        Ok(Self::Credentials(Credentials {
            username,
            password,
            security_token: lookup(&config.security_token_env).unwrap_or_default(),
            domain: config.domain.clone(),
        }))
    }

    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Credentials(c) => format!("credentials for {}", c.username),
            Self::CliSession { target_org } => format!("sf CLI session for org {target_org}"),
        }
    }
}

/// SOAP login endpoint for a login domain.
pub fn login_url(domain: &str, api_version: &str) -> String {
    format!("https://{domain}.salesforce.com/services/Soap/u/{api_version}")
}

// ---------------------------------------------------------------------------
// Credentials login
// ---------------------------------------------------------------------------

/// Perform a SOAP `login` call against `login_url`.
#[instrument(skip_all, fields(username = %credentials.username))]
pub async fn login_with_credentials(
    client: &Client,
    login_url: &str,
    credentials: &Credentials,
) -> Result<SalesforceSession> {
    info!(url = login_url, "logging in to Salesforce");

    let envelope = login_envelope(credentials);
    let response = client
        .post(login_url)
        .header("Content-Type", "text/xml; charset=UTF-8")
        .header("SOAPAction", "login")
        .body(envelope)
        .send()
        .await
        .map_err(|e| ReportError::Network(format!("{login_url}: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ReportError::Network(format!("{login_url}: failed to read body: {e}")))?;

    if !status.is_success() {
        let fault = element_text(&body, "faultstring")
            .ok()
            .flatten()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        error!(%status, %fault, "Salesforce login failed");
        return Err(ReportError::extraction(format!("Salesforce login failed: {fault}")));
    }

    parse_login_response(&body)
}

fn login_envelope(credentials: &Credentials) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:urn="urn:partner.soap.sforce.com">
  <env:Header>
    <urn:CallOptions><urn:client>crmreport</urn:client></urn:CallOptions>
  </env:Header>
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        escape(&credentials.username),
        escape(&credentials.password),
        escape(&credentials.security_token),
    )
}

fn parse_login_response(body: &str) -> Result<SalesforceSession> {
    let session_id = element_text(body, "sessionId")?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReportError::extraction("login response has no sessionId"))?;
    let server_url = element_text(body, "serverUrl")?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReportError::extraction("login response has no serverUrl"))?;

    let server = Url::parse(&server_url)
        .map_err(|e| ReportError::extraction(format!("invalid serverUrl '{server_url}': {e}")))?;

    Ok(SalesforceSession {
        instance_url: origin_of(&server)?,
        access_token: session_id,
    })
}

/// Text of the first element whose local name is `local`, ignoring any
/// namespace prefix or attributes. Entities are decoded and CDATA is kept as-is.
fn element_text(body: &str, local: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(body);
    // Nesting depth inside the matched element; 0 until it opens.
    let mut depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth > 0 {
                    depth += 1;
                } else if e.local_name().as_ref() == local.as_bytes() {
                    depth = 1;
                }
            }
            Ok(Event::Empty(e)) if depth == 0 && e.local_name().as_ref() == local.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(text.trim().to_string()));
                }
            }
            Ok(Event::Text(e)) if depth > 0 => {
                let decoded = e.unescape().map_err(|err| {
                    ReportError::extraction(format!("bad entity in <{local}>: {err}"))
                })?;
                text.push_str(&decoded);
            }
            Ok(Event::CData(e)) if depth > 0 => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(ReportError::extraction(format!(
                    "malformed SOAP response at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }
}

/// Strip a URL down to scheme + host + port.
fn origin_of(url: &Url) -> Result<Url> {
    let host = url
        .host_str()
        .ok_or_else(|| ReportError::extraction(format!("URL has no host: {url}")))?;
    let origin = match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    };
    Url::parse(&origin).map_err(|e| ReportError::extraction(format!("invalid origin '{origin}': {e}")))
}

// ---------------------------------------------------------------------------
// CLI session
// ---------------------------------------------------------------------------

/// Borrow the access token of an org the `sf` CLI is logged in to.
#[instrument(skip_all, fields(org = target_org))]
pub async fn session_from_cli(target_org: &str) -> Result<SalesforceSession> {
    info!("reading Salesforce session from sf CLI");

    let output = tokio::process::Command::new("sf")
        .args(["org", "display", "--target-org", target_org, "--json"])
        .output()
        .await
        .map_err(|e| {
            ReportError::extraction(format!("failed to run `sf`: {e}. Is the Salesforce CLI installed?"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr.trim(), "sf CLI command failed");
        return Err(ReportError::extraction(format!(
            "failed to get Salesforce session from CLI. \
             Make sure you're authenticated: sf org login web -a {target_org}"
        )));
    }

    parse_org_display(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the JSON printed by `sf org display --json`.
pub(crate) fn parse_org_display(stdout: &str) -> Result<SalesforceSession> {
    #[derive(serde::Deserialize)]
    struct OrgDisplay {
        result: OrgInfo,
    }

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct OrgInfo {
        instance_url: String,
        access_token: String,
    }

    let parsed: OrgDisplay = serde_json::from_str(stdout).map_err(|e| {
        error!(error = %e, "failed to parse sf CLI output");
        ReportError::extraction("failed to parse Salesforce CLI response")
    })?;

    let instance_url = Url::parse(&parsed.result.instance_url).map_err(|e| {
        ReportError::extraction(format!("invalid instanceUrl from sf CLI: {e}"))
    })?;

    Ok(SalesforceSession {
        instance_url,
        access_token: parsed.result.access_token,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "ops@example.com".into(),
            password: "p<ss&".into(),
            security_token: "TOKEN".into(),
            domain: "login".into(),
        }
    }

    const LOGIN_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body><loginResponse><result>
    <serverUrl>https://acme.my.salesforce.com/services/Soap/u/59.0/00D000000000001</serverUrl>
    <sessionId>00D000000000001!AQ0AQ.session</sessionId>
  </result></loginResponse></soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn cli_session_mode_needs_no_secrets() {
        let config = SalesforceConfig {
            use_cli_session: true,
            ..Default::default()
        };
        let auth = SalesforceAuth::from_config_with(&config, env(&[])).expect("auth");
        assert!(matches!(auth, SalesforceAuth::CliSession { ref target_org } if target_org == "FMCDev"));
    }

    #[test]
    fn credentials_mode_requires_username_and_password() {
        let config = SalesforceConfig::default();
        let err = SalesforceAuth::from_config_with(&config, env(&[("SF_USERNAME", "ops@example.com")]))
            .unwrap_err();
        assert!(matches!(err, ReportError::Config { .. }));
        assert!(err.to_string().contains("SF_PASSWORD"));
    }

    #[test]
    fn credentials_mode_token_defaults_empty() {
        let config = SalesforceConfig::default();
        let auth = SalesforceAuth::from_config_with(
            &config,
            env(&[("SF_USERNAME", "ops@example.com"), ("SF_PASSWORD", "hunter2")]),
        )
        .expect("auth");
        match auth {
            SalesforceAuth::Credentials(c) => {
                assert_eq!(c.security_token, "");
                assert_eq!(c.domain, "login");
                assert!(!format!("{c:?}").contains("hunter2"));
            }
            other => panic!("expected credentials, got {other:?}"),
        }
    }

    #[test]
    fn envelope_escapes_secrets() {
        let xml = login_envelope(&credentials());
        assert!(xml.contains("<n1:password>p&lt;ss&amp;TOKEN</n1:password>"));
        assert!(xml.contains("<n1:username>ops@example.com</n1:username>"));
    }

    #[test]
    fn login_response_yields_instance_origin() {
        let session = parse_login_response(LOGIN_OK).expect("parse");
        assert_eq!(session.instance_url.as_str(), "https://acme.my.salesforce.com/");
        assert_eq!(session.access_token, "00D000000000001!AQ0AQ.session");
    }

    #[test]
    fn login_response_tolerates_attributes_and_cdata() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <soapenv:Body><loginResponse><result>
    <sf:serverUrl xmlns:sf="urn:partner.soap.sforce.com"><![CDATA[https://acme.my.salesforce.com/services/Soap/u/59.0]]></sf:serverUrl>
    <sessionId xsi:type="xsd:string">00D!AQ&amp;x</sessionId>
  </result></loginResponse></soapenv:Body>
</soapenv:Envelope>"#;
        let session = parse_login_response(body).expect("parse");
        assert_eq!(session.instance_url.as_str(), "https://acme.my.salesforce.com/");
        assert_eq!(session.access_token, "00D!AQ&x");
    }

    #[test]
    fn login_response_without_session_is_extraction_error() {
        let body = "<result><serverUrl>https://acme.my.salesforce.com</serverUrl><sessionId/></result>";
        let err = parse_login_response(body).unwrap_err();
        assert!(matches!(err, ReportError::Extraction(_)));
        assert!(err.to_string().contains("sessionId"));
    }

    #[test]
    fn org_display_parses() {
        let stdout = r#"{"status":0,"result":{"id":"00D","instanceUrl":"https://acme.my.salesforce.com","accessToken":"00D!tok","alias":"FMCDev"}}"#;
        let session = parse_org_display(stdout).expect("parse");
        assert_eq!(session.access_token, "00D!tok");
        assert_eq!(session.instance_url.host_str(), Some("acme.my.salesforce.com"));
    }

    #[test]
    fn org_display_garbage_is_extraction_error() {
        let err = parse_org_display("not json").unwrap_err();
        assert!(matches!(err, ReportError::Extraction(_)));
    }

    #[tokio::test]
    async fn soap_login_against_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/services/Soap/u/59.0"))
            .and(wiremock::matchers::header("SOAPAction", "login"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(LOGIN_OK))
            .mount(&server)
            .await;

        let url = format!("{}/services/Soap/u/59.0", server.uri());
        let session = login_with_credentials(&Client::new(), &url, &credentials())
            .await
            .expect("login");
        assert_eq!(session.access_token, "00D000000000001!AQ0AQ.session");
    }

    #[tokio::test]
    async fn soap_fault_surfaces_message() {
        let server = wiremock::MockServer::start().await;

        let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode>INVALID_LOGIN</faultcode><faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string(fault))
            .mount(&server)
            .await;

        let url = format!("{}/services/Soap/u/59.0", server.uri());
        let err = login_with_credentials(&Client::new(), &url, &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Extraction(_)));
        assert!(err.to_string().contains("INVALID_LOGIN"));
    }

    #[tokio::test]
    async fn soap_fault_entities_are_decoded() {
        let server = wiremock::MockServer::start().await;

        let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode>INVALID_LOGIN</faultcode><faultstring>INVALID_LOGIN: user&apos;s password &amp; token rejected</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string(fault))
            .mount(&server)
            .await;

        let url = format!("{}/services/Soap/u/59.0", server.uri());
        let err = login_with_credentials(&Client::new(), &url, &credentials())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "extraction error: Salesforce login failed: INVALID_LOGIN: user's password & token rejected"
        );
    }

    #[tokio::test]
    async fn fault_without_body_reports_status() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/services/Soap/u/59.0", server.uri());
        let err = login_with_credentials(&Client::new(), &url, &credentials())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }
}
