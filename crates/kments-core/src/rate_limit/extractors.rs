//! Client identifier extraction
//!
//! The rate limiter keys requests by client IP. Which source is trusted
//! depends on whether the server runs behind a reverse proxy.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use hyper::Request;

use crate::app::ServerMode;

/// Client IP of an admitted request, inserted by the rate limit middleware
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIp(pub Box<str>);

/// Extract client IP from request based on ServerMode
///
/// - Standalone mode: Use peer IP directly from ConnectInfo
/// - Proxy mode: Check forwarding headers first
pub fn extract_client_ip<B>(req: &Request<B>, mode: ServerMode) -> Option<IpAddr> {
	let peer = || req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip());
	match mode {
		ServerMode::Standalone => peer(),
		ServerMode::Proxy => extract_from_xff(req)
			.or_else(|| extract_from_x_real_ip(req))
			.or_else(|| extract_from_forwarded(req))
			.or_else(peer),
	}
}

/// Rate limit identifier of a request.
///
/// Loopback addresses mean the proxy did not forward the client address,
/// they are treated as missing.
pub fn client_identifier<B>(req: &Request<B>, mode: ServerMode) -> Option<Box<str>> {
	let ip = extract_client_ip(req, mode)?.to_canonical();
	if ip.is_loopback() || ip.is_unspecified() {
		return None;
	}
	Some(ip.to_string().into())
}

/// Extract IP from X-Forwarded-For header
fn extract_from_xff<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| {
			// leftmost entry is the original client
			s.split(',').next().map(str::trim).and_then(|ip| ip.parse().ok())
		})
}

/// Extract IP from X-Real-IP header
fn extract_from_x_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

/// Extract IP from Forwarded header (RFC 7239)
fn extract_from_forwarded<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers().get("forwarded").and_then(|h| h.to_str().ok()).and_then(|s| {
		// "for=192.0.2.60;proto=http" or "for=\"[2001:db8::1]\""
		s.split([';', ',']).find_map(|part| {
			let (name, value) = part.split_once('=')?;
			if !name.trim().eq_ignore_ascii_case("for") {
				return None;
			}
			value.trim().trim_matches('"').trim_matches('[').trim_matches(']').parse().ok()
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	fn request(headers: &[(&str, &str)], peer: Option<IpAddr>) -> Request<()> {
		let mut builder = Request::builder().uri("/");
		for (name, value) in headers {
			builder = builder.header(*name, *value);
		}
		let mut req = builder.body(()).unwrap();
		if let Some(ip) = peer {
			req.extensions_mut().insert(ConnectInfo(SocketAddr::new(ip, 40000)));
		}
		req
	}

	#[test]
	fn test_standalone_uses_peer() {
		let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
		let req = request(&[("x-forwarded-for", "198.51.100.1")], Some(peer));
		assert_eq!(extract_client_ip(&req, ServerMode::Standalone), Some(peer));
	}

	#[test]
	fn test_proxy_headers() {
		let req = request(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")], None);
		assert_eq!(client_identifier(&req, ServerMode::Proxy).as_deref(), Some("198.51.100.1"));

		let req = request(&[("x-real-ip", " 198.51.100.2 ")], None);
		assert_eq!(client_identifier(&req, ServerMode::Proxy).as_deref(), Some("198.51.100.2"));

		let req = request(&[("forwarded", "proto=https;For=\"[2001:db8::1]\"")], None);
		assert_eq!(client_identifier(&req, ServerMode::Proxy).as_deref(), Some("2001:db8::1"));
	}

	#[test]
	fn test_loopback_is_missing() {
		let req = request(&[], Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
		assert_eq!(client_identifier(&req, ServerMode::Standalone), None);

		let req = request(&[("x-forwarded-for", "::ffff:127.0.0.1")], None);
		assert_eq!(client_identifier(&req, ServerMode::Proxy), None);

		let req = request(&[], None);
		assert_eq!(client_identifier(&req, ServerMode::Proxy), None);
	}
}

// vim: ts=4
