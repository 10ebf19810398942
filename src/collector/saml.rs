use log::info;

use super::types::{SamlIdentity, SamlIdentityPage};
use super::Collector;
use crate::github::queries::fetch_saml_page;
use crate::github::GraphQLExecutor;

impl<E> Collector<'_, E>
where
    E: GraphQLExecutor + ?Sized,
{
    /// Collects the SAML identities linked to members of `organization`.
    ///
    /// Failures are not fatal: a failed or empty first page yields `None`,
    /// a failure on a later page keeps what was already collected.
    pub async fn collect_saml(&self, organization: &str) -> Option<SamlIdentityPage> {
        let mut page: Option<SamlIdentityPage> = None;
        let mut cursor: Option<String> = None;

        loop {
            let connection = match fetch_saml_page(self.executor, organization, cursor.as_deref())
                .await
            {
                Ok(connection) => connection,
                Err(e) => {
                    info!("❌ error: {e}");
                    None
                }
            };

            let Some(connection) = connection.filter(|c| !c.edges.is_empty()) else {
                if page.is_none() {
                    info!("⏸  No SAML found for {organization}");
                }
                return page;
            };

            let identities = connection.edges.into_iter().filter_map(|edge| {
                let login = edge.node.user?.login;
                let name_id = edge.node.saml_identity.and_then(|s| s.name_id)?;
                Some(SamlIdentity { login, name_id })
            });
            page.get_or_insert_with(SamlIdentityPage::default)
                .identities
                .extend(identities);

            match connection.page_info.end_cursor {
                Some(end_cursor) if connection.page_info.has_next_page => {
                    info!("Grabbing more saml identities");
                    cursor = Some(end_cursor);
                }
                _ => return page,
            }
        }
    }
}
