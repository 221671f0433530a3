use super::handlers::{auth, health};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Same wiring as the served router; only the document half is kept.
    let (_router, doc) = api_router().split_for_parts();
    doc
}

/// Router that doubles as the source of the `OpenAPI` document.
///
/// Endpoints registered through `.routes(routes!(...))` are served and
/// documented in one step; anything routed elsewhere (the preflight-only
/// `OPTIONS /health`) stays out of the document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut ensaluti_tag = Tag::new("ensaluti");
    ensaluti_tag.description = Some("OTP sign-in and session issuance API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Signup, signin, OTP verification and profile".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and readiness probes".to_string());

    // Tags go on the seed document; route registration only merges paths and
    // schemas, so the served document is the same either way.
    let mut doc = cargo_openapi();
    doc.tags = Some(vec![ensaluti_tag, auth_tag, health_tag]);

    // GET and PATCH for /auth/profile share one `routes!` call since they share a path.
    OpenApiRouter::with_openapi(doc)
        .routes(routes!(health::health))
        .routes(routes!(health::live))
        .routes(routes!(health::ready))
        .routes(routes!(auth::signup::signup))
        .routes(routes!(auth::signup::verify_signup_otp))
        .routes(routes!(auth::signin::signin))
        .routes(routes!(auth::signin::verify_signin_otp))
        .routes(routes!(auth::recovery::forgot_password))
        .routes(routes!(auth::recovery::reset_password))
        .routes(routes!(auth::profile::get_profile, auth::profile::patch_profile))
}

/// Seed document whose `info` block comes from Cargo.toml package metadata.
fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = package_contact();
    info.license = package_license();

    OpenApiBuilder::new().info(info).build()
}

/// The first Cargo author, either `Name <email>` or a bare name.
fn package_contact() -> Option<Contact> {
    let author = env!("CARGO_PKG_AUTHORS").split(';').next()?.trim();

    let (name, email) = match author.split_once('<') {
        Some((name, rest)) => (name.trim(), rest.trim_end_matches('>').trim()),
        None => (author, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = (!name.is_empty()).then(|| name.to_string());
    contact.email = (!email.is_empty()).then(|| email.to_string());
    Some(contact)
}

fn package_license() -> Option<License> {
    let spdx = non_empty(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(spdx);
    license.identifier = Some(spdx.to_string());
    Some(license)
}

fn non_empty(value: &'static str) -> Option<&'static str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
