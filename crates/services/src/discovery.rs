//! # Discovery Controller
//!
//! Top-level orchestration for the map: merges the live bottle collection,
//! the viewer's location stream, and the active facet filter into renderable
//! annotation or cluster sets, and turns gestures into selection/creation
//! intents. All view recomputation is synchronous; only the two inbound
//! streams are asynchronous.

use std::sync::Arc;

use tracing::{debug, info};

use domains::geo;
use domains::models::{
    AnnotationItem, ClusterItem, Coordinate, UserLocation, Viewport,
};
use domains::ports::{AuthorizationState, Clock, IdentityProvider, LocationProvider, Store};
use domains::time::to_timestamp;

use crate::bottles::{BottleMap, BottleService};
use crate::collection::{self, AnnotationMap};
use crate::snapshot::SnapshotStream;
use crate::spatial::{self, PresentationMode};

/// User-selected facet over the full bottle set. `Locked` and `Expired` are
/// not mutually exclusive by construction; `Active` and `Expired` are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFilter {
    All,
    Mine,
    Active,
    Locked,
    Expired,
}

/// What the map should render for the current viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewState {
    pub mode: PresentationMode,
    /// Populated in `Individual` mode.
    pub annotations: Vec<AnnotationItem>,
    /// Populated in `Clustered` mode.
    pub clusters: Vec<ClusterItem>,
}

/// Intent emitted when the viewer taps an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedBottle {
    pub id: String,
    pub distance_km: f64,
    pub distance_category: String,
}

/// Intent emitted by a long-press on the viewport; handed to the creation
/// flow, opaque to this controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreationIntent {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug)]
pub enum DiscoveryEvent {
    /// The renderable set changed.
    View(MapViewState),
    /// A fresh location fix arrived.
    Location(UserLocation),
    /// The location stream ended (updates stopped or authorization was
    /// revoked). It is never restarted without explicit caller intent.
    LocationEnded,
}

pub struct DiscoveryController {
    identity: Arc<dyn IdentityProvider>,
    location_provider: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,

    bottle_stream: SnapshotStream<BottleMap>,
    location_updates: Option<domains::ports::LocationUpdates>,

    annotations: AnnotationMap,
    user_location: Option<UserLocation>,
    filter: MapFilter,
    viewport: Viewport,
}

impl DiscoveryController {
    /// Subscribes to the discovery collection and, if the platform allows
    /// it, starts location updates. A `NotDetermined` authorization triggers
    /// one request; a denied one simply leaves the location stream off.
    pub fn start(
        bottles: &BottleService,
        identity: Arc<dyn IdentityProvider>,
        location_provider: Arc<dyn LocationProvider>,
        clock: Arc<dyn Clock>,
        viewport: Viewport,
    ) -> Self {
        let authorization = location_provider.authorization_state();
        if authorization == AuthorizationState::NotDetermined {
            location_provider.request_authorization();
        }
        let location_updates =
            authorization.is_authorized().then(|| location_provider.start_updates());

        info!(?authorization, "discovery started");

        Self {
            identity,
            location_provider,
            clock,
            bottle_stream: bottles.observe_all(),
            location_updates,
            annotations: AnnotationMap::new(),
            user_location: None,
            filter: MapFilter::All,
            viewport,
        }
    }

    /// Next discovery delivery. `None` once the collection listener is
    /// detached.
    pub async fn next_event(&mut self) -> Option<DiscoveryEvent> {
        loop {
            match self.location_updates.as_mut() {
                Some(locations) => {
                    let bottle_stream = &mut self.bottle_stream;
                    tokio::select! {
                        snapshot = bottle_stream.next() => {
                            let snapshot = snapshot?;
                            if let Some(view) = self.apply_collection(snapshot) {
                                return Some(DiscoveryEvent::View(view));
                            }
                        }
                        fix = locations.recv() => match fix {
                            Some(location) => {
                                self.user_location = Some(location);
                                return Some(DiscoveryEvent::Location(location));
                            }
                            None => {
                                self.location_updates = None;
                                return Some(DiscoveryEvent::LocationEnded);
                            }
                        },
                    }
                }
                None => {
                    let snapshot = self.bottle_stream.next().await?;
                    if let Some(view) = self.apply_collection(snapshot) {
                        return Some(DiscoveryEvent::View(view));
                    }
                }
            }
        }
    }

    /// Applies a collection snapshot; returns the new view only when the
    /// structural diff is non-empty.
    fn apply_collection(
        &mut self,
        snapshot: crate::snapshot::Snapshot<BottleMap>,
    ) -> Option<MapViewState> {
        let bottles = snapshot.into_value().unwrap_or_default();
        let next = collection::project(&bottles);

        let delta = collection::diff(&self.annotations, &next);
        if delta.is_empty() {
            debug!("collection delivery with no structural change, view kept");
            return None;
        }
        debug!(
            added = delta.added.len(),
            removed = delta.removed.len(),
            changed = delta.changed.len(),
            "collection updated"
        );

        self.annotations = next;
        Some(self.view())
    }

    /// Stops location updates without ending the collection stream.
    pub fn stop_location(&mut self) {
        self.location_provider.stop_updates();
        self.location_updates = None;
    }

    pub fn user_location(&self) -> Option<UserLocation> {
        self.user_location
    }

    pub fn filter(&self) -> MapFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: MapFilter) -> MapViewState {
        info!(?filter, "facet filter changed");
        self.filter = filter;
        self.view()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> MapViewState {
        self.viewport = viewport;
        self.view()
    }

    /// Tap on an annotation: resolves the viewer's distance to it and the
    /// coarse category label. Without a location fix the distance is unknown.
    pub fn select_bottle(&self, id: &str) -> Option<SelectedBottle> {
        let item = self.annotations.get(id)?;

        let Some(user) = self.user_location else {
            return Some(SelectedBottle {
                id: id.to_string(),
                distance_km: 0.0,
                distance_category: "unknown".to_string(),
            });
        };

        let km = geo::distance_km(
            Coordinate { latitude: user.latitude, longitude: user.longitude },
            Coordinate { latitude: item.latitude, longitude: item.longitude },
        );
        Some(SelectedBottle {
            id: id.to_string(),
            distance_km: km,
            distance_category: geo::distance_category(km).to_string(),
        })
    }

    /// Long-press on the viewport.
    pub fn begin_creation(&self, latitude: f64, longitude: f64) -> CreationIntent {
        info!(latitude, longitude, "creation intent");
        CreationIntent { latitude, longitude }
    }

    /// Recomputes the renderable set for the current filter and viewport.
    pub fn view(&self) -> MapViewState {
        let filtered = self.filtered_annotations();
        let in_view = spatial::viewport_filter(&filtered, &self.viewport);

        match spatial::presentation_mode(self.viewport.span) {
            PresentationMode::Individual => MapViewState {
                mode: PresentationMode::Individual,
                annotations: in_view,
                clusters: Vec::new(),
            },
            PresentationMode::Clustered => MapViewState {
                mode: PresentationMode::Clustered,
                clusters: spatial::cluster(&in_view, self.viewport.span),
                annotations: Vec::new(),
            },
        }
    }

    fn filtered_annotations(&self) -> Vec<AnnotationItem> {
        let now = to_timestamp(self.clock.now());
        let viewer = self.identity.current_viewer_id();

        self.annotations
            .values()
            .filter(|item| match self.filter {
                MapFilter::All => true,
                MapFilter::Mine => {
                    viewer.is_some() && item.owner_uid.as_deref() == viewer.as_deref()
                }
                MapFilter::Active => {
                    !item.status.dead && !item.status.locked && item.status.alive_until > now
                }
                MapFilter::Locked => item.status.locked,
                MapFilter::Expired => item.status.dead || item.status.alive_until <= now,
            })
            .cloned()
            .collect()
    }
}
