use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use mse_core::{CollaboratorKind, Converter, Interceptor, ProxyInvoker, ServiceId, Validator};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The collaborators registered for one service.
///
/// Every slot is optional so that partial configuration can be detected
/// rather than papered over.
pub struct Collaborators<Req, Res, InVO, OutVO> {
    pub validator: Option<Arc<dyn Validator<Req>>>,
    pub converter: Option<Arc<dyn Converter<Req, Res, InVO, OutVO>>>,
    pub interceptor: Option<Arc<dyn Interceptor<InVO, OutVO>>>,
    pub invoker: Option<Arc<dyn ProxyInvoker<InVO, OutVO>>>,
}

impl<Req, Res, InVO, OutVO> Collaborators<Req, Res, InVO, OutVO> {
    /// Collaborator kinds with no registration, in pipeline order.
    #[must_use]
    pub fn missing(&self) -> Vec<CollaboratorKind> {
        CollaboratorKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                CollaboratorKind::Validator => self.validator.is_none(),
                CollaboratorKind::Converter => self.converter.is_none(),
                CollaboratorKind::Interceptor => self.interceptor.is_none(),
                CollaboratorKind::ProxyInvoker => self.invoker.is_none(),
            })
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl<Req, Res, InVO, OutVO> Default for Collaborators<Req, Res, InVO, OutVO> {
    fn default() -> Self {
        Self {
            validator: None,
            converter: None,
            interceptor: None,
            invoker: None,
        }
    }
}

impl<Req, Res, InVO, OutVO> Clone for Collaborators<Req, Res, InVO, OutVO> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            converter: self.converter.clone(),
            interceptor: self.interceptor.clone(),
            invoker: self.invoker.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryTable / RegistryBuilder
// ---------------------------------------------------------------------------

/// Immutable lookup table from service identifier to its collaborators.
pub struct RegistryTable<Req, Res, InVO, OutVO> {
    entries: HashMap<ServiceId, Collaborators<Req, Res, InVO, OutVO>>,
}

impl<Req, Res, InVO, OutVO> RegistryTable<Req, Res, InVO, OutVO> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, service: ServiceId) -> Option<&Collaborators<Req, Res, InVO, OutVO>> {
        self.entries.get(&service)
    }
}

/// Explicit startup registration of collaborators.
///
/// Each kind is registered independently; `build()` freezes the result into
/// a [`RegistryTable`].
pub struct RegistryBuilder<Req, Res, InVO, OutVO> {
    entries: HashMap<ServiceId, Collaborators<Req, Res, InVO, OutVO>>,
}

impl<Req, Res, InVO, OutVO> RegistryBuilder<Req, Res, InVO, OutVO> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn slot(&mut self, service: ServiceId) -> &mut Collaborators<Req, Res, InVO, OutVO> {
        self.entries.entry(service).or_default()
    }

    pub fn register_validator<V>(&mut self, service: ServiceId, validator: V) -> &mut Self
    where
        V: Validator<Req> + 'static,
    {
        self.slot(service).validator = Some(Arc::new(validator));
        self
    }

    pub fn register_converter<C>(&mut self, service: ServiceId, converter: C) -> &mut Self
    where
        C: Converter<Req, Res, InVO, OutVO> + 'static,
    {
        self.slot(service).converter = Some(Arc::new(converter));
        self
    }

    pub fn register_interceptor<I>(&mut self, service: ServiceId, interceptor: I) -> &mut Self
    where
        I: Interceptor<InVO, OutVO> + 'static,
    {
        self.slot(service).interceptor = Some(Arc::new(interceptor));
        self
    }

    pub fn register_invoker<P>(&mut self, service: ServiceId, invoker: P) -> &mut Self
    where
        P: ProxyInvoker<InVO, OutVO> + 'static,
    {
        self.slot(service).invoker = Some(Arc::new(invoker));
        self
    }

    /// Registers all four collaborators of a service at once.
    pub fn register_set<V, C, I, P>(
        &mut self,
        service: ServiceId,
        validator: V,
        converter: C,
        interceptor: I,
        invoker: P,
    ) -> &mut Self
    where
        V: Validator<Req> + 'static,
        C: Converter<Req, Res, InVO, OutVO> + 'static,
        I: Interceptor<InVO, OutVO> + 'static,
        P: ProxyInvoker<InVO, OutVO> + 'static,
    {
        self.register_validator(service, validator)
            .register_converter(service, converter)
            .register_interceptor(service, interceptor)
            .register_invoker(service, invoker)
    }

    #[must_use]
    pub fn build(self) -> RegistryTable<Req, Res, InVO, OutVO> {
        RegistryTable {
            entries: self.entries,
        }
    }
}

impl<Req, Res, InVO, OutVO> Default for RegistryBuilder<Req, Res, InVO, OutVO> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Resolves service identifiers to their collaborators.
///
/// Lookups read the current table snapshot without locking. Reconfiguration
/// swaps in a whole new table via [`ServiceRegistry::publish`]; a table is
/// never mutated after it has been built.
pub struct ServiceRegistry<Req, Res, InVO, OutVO> {
    table: ArcSwap<RegistryTable<Req, Res, InVO, OutVO>>,
}

impl<Req, Res, InVO, OutVO> ServiceRegistry<Req, Res, InVO, OutVO> {
    #[must_use]
    pub fn new(table: RegistryTable<Req, Res, InVO, OutVO>) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Atomically replaces the lookup table. Lookups already in progress keep
    /// the table they loaded.
    pub fn publish(&self, table: RegistryTable<Req, Res, InVO, OutVO>) {
        self.table.store(Arc::new(table));
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistryTable<Req, Res, InVO, OutVO>> {
        self.table.load_full()
    }

    pub fn validator(&self, service: ServiceId) -> Option<Arc<dyn Validator<Req>>> {
        self.table.load().get(service)?.validator.clone()
    }

    pub fn converter(
        &self,
        service: ServiceId,
    ) -> Option<Arc<dyn Converter<Req, Res, InVO, OutVO>>> {
        self.table.load().get(service)?.converter.clone()
    }

    pub fn interceptor(&self, service: ServiceId) -> Option<Arc<dyn Interceptor<InVO, OutVO>>> {
        self.table.load().get(service)?.interceptor.clone()
    }

    pub fn invoker(&self, service: ServiceId) -> Option<Arc<dyn ProxyInvoker<InVO, OutVO>>> {
        self.table.load().get(service)?.invoker.clone()
    }

    /// All collaborators of a service. Unknown services resolve to an empty set.
    #[must_use]
    pub fn resolve(&self, service: ServiceId) -> Collaborators<Req, Res, InVO, OutVO> {
        self.table.load().get(service).cloned().unwrap_or_default()
    }

    /// Registered service identifiers, sorted.
    #[must_use]
    pub fn services(&self) -> Vec<ServiceId> {
        let mut services: Vec<_> = self.table.load().entries.keys().copied().collect();
        services.sort_unstable();
        services
    }

    /// Collaborator kinds the given service lacks. Unknown services lack all four.
    #[must_use]
    pub fn missing_collaborators(&self, service: ServiceId) -> Vec<CollaboratorKind> {
        self.resolve(service).missing()
    }

    /// Registered services with at least one missing collaborator, sorted.
    #[must_use]
    pub fn incomplete_services(&self) -> Vec<(ServiceId, Vec<CollaboratorKind>)> {
        let table = self.table.load();
        let mut incomplete: Vec<_> = table
            .entries
            .iter()
            .filter_map(|(service, set)| {
                let missing = set.missing();
                (!missing.is_empty()).then_some((*service, missing))
            })
            .collect();
        incomplete.sort_unstable_by_key(|(service, _)| *service);
        incomplete
    }
}

impl<Req, Res, InVO, OutVO> Default for ServiceRegistry<Req, Res, InVO, OutVO> {
    fn default() -> Self {
        Self::new(RegistryTable::empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mse_core::{ExecutionContext, ResponseContext};

    use super::*;

    const ALPHA: ServiceId = ServiceId::new("alpha");
    const BETA: ServiceId = ServiceId::new("beta");

    type TestRegistry = ServiceRegistry<String, String, String, String>;
    type TestBuilder = RegistryBuilder<String, String, String, String>;

    /// Collaborator that answers with a fixed tag so tests can tell tables apart.
    #[derive(Clone)]
    struct Tagged(&'static str);

    #[async_trait]
    impl Validator<String> for Tagged {
        async fn validate(&self, _request: &String) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Converter<String, String, String, String> for Tagged {
        async fn request_to_vo(&self, request: &String) -> anyhow::Result<String> {
            Ok(request.clone())
        }

        async fn vo_to_response(&self, response: ResponseContext<String>) -> anyhow::Result<String> {
            Ok(response.into_data().unwrap_or_default())
        }
    }

    #[async_trait]
    impl Interceptor<String, String> for Tagged {
        async fn intercept(&self, ctx: &ExecutionContext<String, String>) -> anyhow::Result<String> {
            Ok(ctx.request().cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl ProxyInvoker<String, String> for Tagged {
        async fn invoke(&self, _request: &String) -> anyhow::Result<ResponseContext<String>> {
            Ok(ResponseContext::ok(self.0.to_string()))
        }
    }

    fn full_set(builder: &mut TestBuilder, service: ServiceId, tag: &'static str) {
        builder.register_set(service, Tagged(tag), Tagged(tag), Tagged(tag), Tagged(tag));
    }

    #[test]
    fn resolves_every_kind_for_a_full_set() {
        let mut builder = TestBuilder::new();
        full_set(&mut builder, ALPHA, "a");
        let registry = TestRegistry::new(builder.build());

        assert!(registry.validator(ALPHA).is_some());
        assert!(registry.converter(ALPHA).is_some());
        assert!(registry.interceptor(ALPHA).is_some());
        assert!(registry.invoker(ALPHA).is_some());
        assert!(registry.resolve(ALPHA).is_complete());
    }

    #[test]
    fn unknown_service_resolves_nothing() {
        let registry = TestRegistry::default();
        assert!(registry.validator(ALPHA).is_none());
        assert!(registry.invoker(ALPHA).is_none());
        assert_eq!(registry.missing_collaborators(ALPHA), CollaboratorKind::ALL.to_vec());
    }

    #[test]
    fn partial_registration_is_reported() {
        let mut builder = TestBuilder::new();
        builder
            .register_validator(ALPHA, Tagged("a"))
            .register_converter(ALPHA, Tagged("a"));
        full_set(&mut builder, BETA, "b");
        let registry = TestRegistry::new(builder.build());

        assert!(registry.validator(ALPHA).is_some());
        assert!(registry.interceptor(ALPHA).is_none());
        assert_eq!(
            registry.missing_collaborators(ALPHA),
            vec![CollaboratorKind::Interceptor, CollaboratorKind::ProxyInvoker]
        );
        assert_eq!(
            registry.incomplete_services(),
            vec![(
                ALPHA,
                vec![CollaboratorKind::Interceptor, CollaboratorKind::ProxyInvoker]
            )]
        );
    }

    #[test]
    fn services_are_sorted() {
        let mut builder = TestBuilder::new();
        full_set(&mut builder, BETA, "b");
        full_set(&mut builder, ALPHA, "a");
        let registry = TestRegistry::new(builder.build());
        assert_eq!(registry.services(), vec![ALPHA, BETA]);
    }

    #[tokio::test]
    async fn publish_swaps_the_whole_table() {
        let mut first = TestBuilder::new();
        full_set(&mut first, ALPHA, "v1");
        let registry = TestRegistry::new(first.build());

        let old_snapshot = registry.snapshot();
        let old_invoker = registry.invoker(ALPHA).unwrap();

        let mut second = TestBuilder::new();
        full_set(&mut second, BETA, "v2");
        registry.publish(second.build());

        assert!(registry.invoker(ALPHA).is_none());
        assert!(registry.invoker(BETA).is_some());

        // Handles resolved before the swap keep working against the old table.
        assert!(old_snapshot.get(ALPHA).is_some());
        let resp = old_invoker.invoke(&String::new()).await.unwrap();
        assert_eq!(resp.into_data().as_deref(), Some("v1"));
    }

    #[test]
    fn re_registering_a_kind_replaces_it() {
        let mut builder = TestBuilder::new();
        full_set(&mut builder, ALPHA, "old");
        builder.register_invoker(ALPHA, Tagged("new"));
        let registry = TestRegistry::new(builder.build());
        assert!(registry.resolve(ALPHA).is_complete());
        assert_eq!(registry.services(), vec![ALPHA]);
    }
}
