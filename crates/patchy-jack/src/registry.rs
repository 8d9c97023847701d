//! JACK-backed port registry.

use std::collections::BTreeSet;
use std::ffi::{CStr, c_char};

use jack::jack_sys;
use jack::{Client, ClientOptions, PortFlags};
use tracing::{debug, info};

use patchy_core::{LinkError, PortRegistry};

use crate::error::{JackError, JackResult};

/// Name the client registers with on the JACK server.
pub const CLIENT_NAME: &str = "patchy";

/// Port registry that queries and changes a running JACK server.
///
/// The client is opened once and closed when this value is dropped.
pub struct JackRegistry {
    client: Client,
}

impl JackRegistry {
    /// Connect to the JACK server as [`CLIENT_NAME`].
    ///
    /// # Errors
    /// Returns [`JackError::ClientOpenFailed`] if the server cannot be reached.
    pub fn open() -> JackResult<Self> {
        let (client, status) = Client::new(CLIENT_NAME, ClientOptions::empty())
            .map_err(|e| JackError::ClientOpenFailed(e.to_string()))?;
        info!(name = %client.name(), ?status, "Connected to JACK");
        Ok(Self { client })
    }

    fn ports(&self, flags: PortFlags) -> BTreeSet<String> {
        self.client.ports(None, None, flags).into_iter().collect()
    }
}

impl PortRegistry for JackRegistry {
    fn output_ports(&self) -> BTreeSet<String> {
        self.ports(PortFlags::IS_OUTPUT)
    }

    fn all_ports(&self) -> BTreeSet<String> {
        self.ports(PortFlags::empty())
    }

    fn connections_of(&self, port: &str) -> BTreeSet<String> {
        let Some(handle) = self.client.port_by_name(port) else {
            return BTreeSet::new();
        };
        all_connections(&self.client, &handle).into_iter().collect()
    }

    fn connect(&self, output: &str, input: &str) -> Result<(), LinkError> {
        debug!(output, input, "jack connect");
        match self.client.connect_ports_by_name(output, input) {
            Ok(()) => Ok(()),
            Err(jack::Error::PortAlreadyConnected(..)) => Err(LinkError::AlreadyConnected),
            Err(e) => Err(LinkError::Failed(e.to_string())),
        }
    }

    fn disconnect(&self, output: &str, input: &str) -> Result<(), LinkError> {
        debug!(output, input, "jack disconnect");
        self.client
            .disconnect_ports_by_name(output, input)
            .map_err(|e| LinkError::Failed(e.to_string()))
    }
}

/// Every port connected to `port`, whichever client owns it.
///
/// `Port::get_connections` is only defined for ports this client owns, and
/// patchy never owns the ports it inspects.
#[allow(unsafe_code)]
fn all_connections(client: &Client, port: &jack::Port<jack::Unowned>) -> Vec<String> {
    // SAFETY: both handles are live for the call. The returned array is
    // NULL or NULL-terminated, owned by us, and released with jack_free.
    unsafe {
        let list = jack_sys::jack_port_get_all_connections(client.raw(), port.raw());
        if list.is_null() {
            return Vec::new();
        }
        let names = port_names(list);
        jack_sys::jack_free(list.cast());
        names
    }
}

/// Copy a NULL-terminated array of C strings.
///
/// # Safety
/// `list` must be non-null and point to a NULL-terminated array of valid
/// C strings.
#[allow(unsafe_code)]
unsafe fn port_names(list: *const *const c_char) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = list;
    // SAFETY: guaranteed by the caller.
    unsafe {
        while !(*cursor).is_null() {
            names.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::ptr;

    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn test_port_names_reads_until_terminator() {
        let owned = [CString::new("system:playback_1").unwrap(), CString::new("synth:in").unwrap()];
        let list: Vec<*const c_char> =
            owned.iter().map(|s| s.as_ptr()).chain(std::iter::once(ptr::null())).collect();

        let names = unsafe { port_names(list.as_ptr()) };

        assert_eq!(names, vec!["system:playback_1", "synth:in"]);
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_port_names_empty_list() {
        let list: [*const c_char; 1] = [ptr::null()];

        assert!(unsafe { port_names(list.as_ptr()) }.is_empty());
    }
}
