use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;
use tracing::warn;

/// Resolves device manufacturers from MAC addresses.
pub trait VendorRepository: Send + Sync {
    /// Returns the vendor registered for the MAC's OUI, if known.
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

/// Retrieves or initializes the **Organizationally unique identifier** database.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("failed to load OUI database: {e}");
                None
            }
        })
        .as_ref()
}

pub struct MacOuiRepo;

impl VendorRepository for MacOuiRepo {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let db = get_oui_db()?;
        match db.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

/// Repository that never knows a vendor. Used when enrichment is unwanted.
pub struct NoVendors;

impl VendorRepository for NoVendors {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        None
    }
}
