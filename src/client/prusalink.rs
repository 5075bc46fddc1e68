//! PrusaLink (`/api/v1`) device client.

use super::DeviceClient;
use crate::models::{DeviceConfig, DeviceFamily, DeviceState};
use crate::services::remote::ListingEntry;
use crate::{Error, Result};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::{Method, Url};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads of large print files over Wi-Fi can take minutes
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct StatusPayload {
    storage: Option<StorageStatus>,
    printer: Option<PrinterStatus>,
}

#[derive(Debug, Deserialize)]
struct StorageStatus {
    path: String,
}

#[derive(Debug, Deserialize)]
struct PrinterStatus {
    state: Option<String>,
}

/// Map a PrusaLink printer state label to the coarse gate state
#[must_use]
pub fn state_from_label(label: &str) -> DeviceState {
    match label.to_ascii_uppercase().as_str() {
        "IDLE" | "READY" | "FINISHED" => DeviceState::Idle,
        "BUSY" | "PRINTING" | "PAUSED" | "STOPPED" | "ATTENTION" | "ERROR" => DeviceState::Busy,
        other => {
            log::warn!("Unrecognized printer state: \"{other}\"");
            DeviceState::Unknown
        }
    }
}

/// Content type PrusaLink expects for an uploaded file
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("gcode") => "text/x.gcode",
        _ => "application/octet-stream",
    }
}

/// Blocking HTTP client for PrusaLink printers
///
/// Requests authenticate with the `X-Api-Key` header carrying the configured
/// password.
pub struct PrusaLinkClient {
    http: Client,
}

impl PrusaLinkClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http })
    }

    fn endpoint(device: &DeviceConfig, endpoint: &str, path: &str) -> Result<Url> {
        let base = format!("{}/api/v1", device.host.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("invalid host '{}': {e}", device.host)))?;

        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("host '{}' cannot be a base URL", device.host)))?
            .push(endpoint)
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, device: &DeviceConfig) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("X-Api-Key", &device.password)
    }

    fn send(request: RequestBuilder, device: &DeviceConfig) -> Result<Response> {
        request
            .send()
            .map_err(|e| Error::Transport(format!("{}: {e}", device.name)))
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, device: &DeviceConfig, url: Url) -> Result<T> {
        log::trace!("GET {url}");
        let response = Self::send(self.request(Method::GET, url.clone(), device), device)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{}: GET {url} returned {status}",
                device.name
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| Error::Transport(format!("{}: {e}", device.name)))?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::Transport(format!("{}: unexpected payload from {url}: {e}", device.name))
        })
    }

    fn status(&self, device: &DeviceConfig) -> Result<StatusPayload> {
        let url = Self::endpoint(device, "status", "")?;
        self.get_json(device, url)
    }

    fn fetch_folder(&self, device: &DeviceConfig, short_path: &str) -> Result<ListingEntry> {
        let url = Self::endpoint(device, "files", short_path)?;
        let mut folder: ListingEntry = self.get_json(device, url)?;

        if !folder.is_folder() {
            return Err(Error::MalformedListing(format!(
                "{short_path} is not a folder"
            )));
        }

        // A folder's own response lacks the long name and timestamp the
        // parent listing reported, so only its children are taken from it.
        let mut children = folder.children.take().unwrap_or_default();
        for child in &mut children {
            if child.is_folder() {
                let child_path = format!("{}/{}", short_path.trim_end_matches('/'), child.name);
                child.children = self.fetch_folder(device, &child_path)?.children;
            }
        }
        folder.children = Some(children);
        Ok(folder)
    }

    /// Send a mutating request; refusals by the device are `Ok(false)`
    fn mutate(&self, request: RequestBuilder, device: &DeviceConfig, what: &str) -> Result<bool> {
        let response = Self::send(request, device)?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            log::warn!("{}: {what} refused with {status}", device.name);
            Ok(false)
        }
    }
}

impl DeviceClient for PrusaLinkClient {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::PrusaLink
    }

    fn query_state(&self, device: &DeviceConfig) -> Result<DeviceState> {
        let status = self.status(device)?;
        let state = status
            .printer
            .and_then(|printer| printer.state)
            .map_or(DeviceState::Unknown, |label| state_from_label(&label));
        Ok(state)
    }

    fn fetch_listing(&self, device: &DeviceConfig) -> Result<ListingEntry> {
        let storage = self.status(device)?.storage.ok_or_else(|| {
            Error::Transport(format!("{}: status reports no storage", device.name))
        })?;
        log::debug!("{}: storage root is {}", device.name, storage.path);
        self.fetch_folder(device, &storage.path)
    }

    fn upload(&self, device: &DeviceConfig, local_path: &Path, remote_path: &str) -> Result<bool> {
        let url = Self::endpoint(device, "files", remote_path)?;
        let file = File::open(local_path)?;
        let length = file.metadata()?.len();

        let request = self
            .request(Method::PUT, url, device)
            .timeout(UPLOAD_TIMEOUT)
            .header("Overwrite", "true")
            .header("Print-After-Upload", "false")
            .header("Content-Type", content_type_for(local_path))
            .body(Body::sized(file, length));
        self.mutate(request, device, &format!("upload of {remote_path}"))
    }

    fn delete(&self, device: &DeviceConfig, remote_path: &str) -> Result<bool> {
        let url = Self::endpoint(device, "files", remote_path)?;
        let request = self.request(Method::DELETE, url, device);
        self.mutate(request, device, &format!("delete of {remote_path}"))
    }

    fn create_folder(&self, device: &DeviceConfig, remote_path: &str) -> Result<bool> {
        let url = Self::endpoint(device, "files", remote_path)?;
        let request = self
            .request(Method::PUT, url, device)
            .header("Create-Folder", "true");
        self.mutate(request, device, &format!("folder creation of {remote_path}"))
    }
}
