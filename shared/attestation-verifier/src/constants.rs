//! Constants for attestation report verification

/// The Intel SGX Attestation Report Signing CA root certificate.
///
/// IAS report signing certificates chain to this root. It is pinned at build
/// time; [`crate::IasReportVerifier::with_root_certificate`] can replace it
/// for non-production environments.
pub const IAS_ROOT_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIFSzCCA7OgAwIBAgIJANEHdl0yVhaNMA0GCSqGSIb3DQEBCwUAMH4xCzAJBgNV
BAYTAlVTMQswCQYDVQQIDAJDQTEUMBIGA1UEBwwLU2FudGEgQ2xhcmExGjAYBgNV
BAoMEUludGVsIENvcnBvcmF0aW9uMTAwLgYDVQQDDCdJbnRlbCBTR1ggQXR0ZXN0
YXRpb24gUmVwb3J0IFNpZ25pbmcgQ0EwIBcNMTYxMTE0MTUzNzMxWhgPMjA0OTEy
MzEyMzU5NTlaMH4xCzAJBgNVBAYTAlVTMQswCQYDVQQIDAJDQTEUMBIGA1UEBwwL
U2FudGEgQ2xhcmExGjAYBgNVBAoMEUludGVsIENvcnBvcmF0aW9uMTAwLgYDVQQD
DCdJbnRlbCBTR1ggQXR0ZXN0YXRpb24gUmVwb3J0IFNpZ25pbmcgQ0EwggGiMA0G
CSqGSIb3DQEBAQUAA4IBjwAwggGKAoIBgQCfPGR+tXc8u1EtJzLA10Feu1Wg+p7e
LmSRmeaCHbkQ1TF3Nwl3RmpqXkeGzNLd69QUnWovYyVSndEMyYc3sHecGgfinEeh
rgBJSEdsSJ9FpaFdesjsxqzGRa20PYdnnfWcCTvFoulpbFR4VBuXnnVLVzkUvlXT
L/TAnd8nIZk0zZkFJ7P5LtePvykkar7LcSQO85wtcQe0R1Raf/sQ6wYKaKmFgCGe
NpEJUmg4ktal4qgIAxk+QHUxQE42sxViN5mqglB0QJdUot/o9a/V/mMe6UVz9sNA
lSVk5GiEydKh2E3YBbl/RwT+eeq1rB/RR6G/NntFotzLy8JYYLeWJTpGAKeuk4o7
hnXp9x4AD1yFIoT6MtTFvWOfpAVxBOUhNL4a0BjQXnzHKgDJKJZdI5eUsr39IRAr
57qyOlgszFzQw92QeahHmaQ5h2e5tgaiIjtYKfqcTYxwzsjSKNo5PxwhsyTuPdWE
ft9f2v7lUrQi7kKBE6qzvPNiJlGMKlhEnbUCAwEAAaOBpDCBoTAfBgNVHSMEGDAW
gBR4Q3t2pn680K9+QjfrNXw7hwFRPDAPBgNVHRMBAf8EBTADAQH/MA4GA1UdDwEB
/wQEAwIBBjBgBgNVHR8EWTBXMFWgU6BRhk9odHRwOi8vdHJ1c3RlZHNlcnZpY2Vz
LmludGVsLmNvbS9jb250ZW50L0NSTC9TR1gvQXR0ZXN0YXRpb25SZXBvcnRTaWdu
aW5nQ0EuY3JsMA0GCSqGSIb3DQEBCwUAA4IBgQBzP3/IVRKcyT4P9VRmaPGlIuae
sQOcs/hqVWSG+AtHwyWfSNouKn+qNPGoWFnJ1DtDaQRAvoWu1MKduRShagFrwUC0
RQJh6iOnYRCQeWuSrLa8UZBPxTTmZmDTrvUS7ryvLu2MPdCrtCLkF1dbd4LUOWW1
DJUxCLOCQXnXt/fMDr6ZMHd6oTPlIBpbBS6KONntUK8WzLpyLLOGMX35s+D28x/B
SHz6Vxtg4UeAnyzFLYLqartSF/5ehUkWmjmKuwFeRVWiL/BlJWvMYJwB2hUY/HbM
DSCLtFV3ZXw45BBnnvLGksvVQpZwoXg3hWAPfSpv925DLHSLT9rkrjTRwaHFGhpg
W3J7CLMAP++5DyN3Pkk4xYmLG1cEWh6zIMCPmDSznRjdSLqYyRdQ3QGHbHkXGGZ1
RzJ2aaiiQrvRsiuHd4QLMEWf7gnr4MLSfWjHvzP1AJv3zNMJ5DlNn2GIu9Nhcxed
bzAcTZvbcwAaIOPL7zfGuSxFN60nzNzEBrxIZxlv+dxDLZWhMI+n2q3CDLIejVY=
-----END CERTIFICATE-----";

/// ISV enclave quote status that carries no outstanding advisories.
pub const QUOTE_STATUS_OK: &str = "OK";

/// IAS AVR timestamp format, UTC with no zone suffix.
pub const AVR_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
