//! HTTP handlers.

mod topics;
mod upload;

pub use topics::*;
pub use upload::*;

use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::views::{Flash, FLASH_COOKIE};

/// Queue `flash` for the next rendered page.
pub fn with_flash(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.key()))
            .path("/")
            .http_only(true),
    )
}

/// Read and clear the pending flash message, if any.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<&'static str>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let message = Flash::from_key(cookie.value()).map(|flash| flash.message());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}
