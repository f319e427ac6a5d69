use crate::catalog::filter_cities;
use crate::error::{GuideError, LocationError};
use crate::geo::nearest;
use crate::location::{Fix, LocationState};
use crate::models::{City, Dish};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Work a transition hands back to the runtime. Results come back as
/// [`Event`](crate::events::Event)s.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch the dish list for `city` after `delay`, tagged with `ticket`.
    LoadDishes {
        ticket: u64,
        city: City,
        delay: Duration,
    },
    /// Remember `slug` as the last chosen city.
    PersistCity(String),
    RequestLocation,
}

/// The overlay on top of the dish list. The UI has a single focus, so at
/// most one is open.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum Modal {
    #[default]
    None,
    CitySelector,
    DishDetail,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ModalVisibility {
    pub city_selector: bool,
    pub dish_detail: bool,
}

/// The application state machine.
///
/// Owns the current city, its dish list, the loading flag, the dish shown in
/// the detail view and the open overlay. Every change goes through one of the
/// transition methods below; the renderer only reads.
pub struct App {
    cities: Vec<City>,
    current_city: City,
    dishes: Vec<Dish>,
    is_loading: bool,
    selected_dish: Option<Dish>,
    modal: Modal,

    // Only the load carrying this ticket may fill `dishes`.
    pending_load: Option<u64>,
    next_ticket: u64,
    switch_delay: Duration,

    location: LocationState,
    suggestion: Option<City>,

    // Cursors
    pub selected_index: usize,
    pub city_query: String,
    pub city_cursor: usize,

    pub tick_count: usize,
    pub should_quit: bool,
}

impl App {
    /// Builds the initial state: the default city, no dishes, loading.
    ///
    /// Falls back to the first city when `default_slug` is not in `cities`.
    /// An empty city list can't be shown at all and is rejected.
    pub fn new(
        cities: Vec<City>,
        default_slug: &str,
        switch_delay: Duration,
    ) -> Result<Self, GuideError> {
        let current_city = cities
            .iter()
            .find(|c| c.slug == default_slug)
            .or_else(|| cities.first())
            .cloned()
            .ok_or(GuideError::EmptyCatalog)?;

        Ok(Self {
            cities,
            current_city,
            dishes: Vec::new(),
            is_loading: true,
            selected_dish: None,
            modal: Modal::None,
            pending_load: None,
            next_ticket: 0,
            switch_delay,
            location: LocationState::default(),
            suggestion: None,
            selected_index: 0,
            city_query: String::new(),
            city_cursor: 0,
            tick_count: 0,
            should_quit: false,
        })
    }

    /// Restores `restored_slug` (or keeps the default when it isn't a known
    /// city), loads its dishes and starts a background location lookup.
    pub fn start(&mut self, restored_slug: &str) -> Vec<Command> {
        if let Some(city) = self.city_by_slug(restored_slug).cloned() {
            self.current_city = city;
        } else {
            warn!(
                "Saved city '{}' is not in the catalog, staying on '{}'",
                restored_slug, self.current_city.slug
            );
        }
        info!("Starting in {}", self.current_city.name_romanized);

        self.location.loading = true;
        let load = self.begin_load(Duration::ZERO);
        vec![load, Command::RequestLocation]
    }

    pub fn request_city_selector(&mut self) {
        self.close_dish_detail();
        self.modal = Modal::CitySelector;
        self.city_query.clear();
        self.city_cursor = self
            .cities
            .iter()
            .position(|c| c.id == self.current_city.id)
            .unwrap_or(0);
    }

    pub fn close_city_selector(&mut self) {
        if self.modal == Modal::CitySelector {
            self.modal = Modal::None;
        }
    }

    /// Switches to `city`. Only valid from the open city selector.
    ///
    /// The new city becomes current immediately with an empty, loading list;
    /// its dishes arrive later through [`dishes_loaded`](Self::dishes_loaded).
    pub fn select_city(&mut self, city: &City) -> Result<Vec<Command>, GuideError> {
        if self.modal != Modal::CitySelector {
            return Err(GuideError::SelectorClosed);
        }
        let city = self
            .cities
            .iter()
            .find(|c| c.id == city.id)
            .cloned()
            .ok_or_else(|| GuideError::UnknownCity(city.slug.clone()))?;

        self.modal = Modal::None;
        info!("Switching to {}", city.name_romanized);
        self.current_city = city;
        self.refresh_suggestion();

        let persist = Command::PersistCity(self.current_city.slug.clone());
        let load = self.begin_load(self.switch_delay);
        Ok(vec![persist, load])
    }

    /// Applies a finished content load, unless a newer one has been issued
    /// since, in which case the result is dropped.
    pub fn dishes_loaded(&mut self, ticket: u64, dishes: Vec<Dish>) {
        if self.pending_load != Some(ticket) {
            debug!("Dropping stale content load #{}", ticket);
            return;
        }
        self.pending_load = None;

        let (ours, others): (Vec<Dish>, Vec<Dish>) = dishes
            .into_iter()
            .partition(|d| d.city_id == self.current_city.id);
        if !others.is_empty() {
            warn!(
                "Ignoring {} dishes that don't belong to {}",
                others.len(),
                self.current_city.id
            );
        }

        self.replace_dishes(ours);
        self.is_loading = false;
    }

    /// Records the lookup result. A nearer city becomes a suggestion; the
    /// current city never changes here, and failures are only logged.
    pub fn location_resolved(&mut self, outcome: Result<Fix, LocationError>) {
        self.location.loading = false;
        match outcome {
            Ok(fix) => {
                self.location.fix = Some(fix);
                self.location.error = None;
                self.refresh_suggestion();
                if let Some(city) = &self.suggestion {
                    info!("Nearest city: {} ({})", city.name, city.name_romanized);
                }
            }
            Err(e) => {
                debug!("No location: {}", e);
                self.location.error = Some(e);
            }
        }
    }

    /// Shows `dish` in the detail view. It must be in the current list.
    pub fn open_dish_detail(&mut self, dish: &Dish) -> Result<(), GuideError> {
        let listed = self
            .dishes
            .iter()
            .find(|d| d.id == dish.id)
            .cloned()
            .ok_or_else(|| GuideError::DishNotListed(dish.id.clone()))?;
        self.selected_dish = Some(listed);
        self.modal = Modal::DishDetail;
        Ok(())
    }

    pub fn close_dish_detail(&mut self) {
        if self.modal == Modal::DishDetail {
            self.modal = Modal::None;
        }
        self.selected_dish = None;
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    /// Maps a key press onto a transition, returning whatever work it asks for.
    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }

        match self.modal {
            Modal::CitySelector => return self.handle_selector_key(key),
            Modal::DishDetail => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q')
                ) {
                    self.close_dish_detail();
                }
            }
            Modal::None => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('c') | KeyCode::Char('l') => self.request_city_selector(),
                KeyCode::Down | KeyCode::Char('j') => {
                    if !self.dishes.is_empty() {
                        self.selected_index = (self.selected_index + 1) % self.dishes.len();
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if !self.dishes.is_empty() {
                        self.selected_index = self
                            .selected_index
                            .checked_sub(1)
                            .unwrap_or(self.dishes.len() - 1);
                    }
                }
                KeyCode::Enter => {
                    if let Some(dish) = self.dishes.get(self.selected_index).cloned() {
                        if let Err(e) = self.open_dish_detail(&dish) {
                            warn!("{}", e);
                        }
                    }
                }
                _ => {}
            },
        }
        Vec::new()
    }

    fn handle_selector_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Esc => self.close_city_selector(),
            KeyCode::Up => self.city_cursor = self.city_cursor.saturating_sub(1),
            KeyCode::Down => {
                let last = self.filtered_cities().len().saturating_sub(1);
                self.city_cursor = (self.city_cursor + 1).min(last);
            }
            KeyCode::Enter => {
                if let Some(city) = self.highlighted_city().cloned() {
                    match self.select_city(&city) {
                        Ok(commands) => return commands,
                        Err(e) => warn!("{}", e),
                    }
                }
            }
            KeyCode::Backspace => {
                self.city_query.pop();
                self.city_cursor = 0;
            }
            KeyCode::Char(c) => {
                self.city_query.push(c);
                self.city_cursor = 0;
            }
            _ => {}
        }
        Vec::new()
    }

    fn begin_load(&mut self, delay: Duration) -> Command {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending_load = Some(ticket);
        self.is_loading = true;
        self.replace_dishes(Vec::new());
        Command::LoadDishes {
            ticket,
            city: self.current_city.clone(),
            delay,
        }
    }

    // Keeps the detail view pointing at a listed dish.
    fn replace_dishes(&mut self, dishes: Vec<Dish>) {
        self.dishes = dishes;
        self.selected_index = 0;
        let still_listed = self
            .selected_dish
            .as_ref()
            .is_some_and(|sel| self.dishes.iter().any(|d| d.id == sel.id));
        if !still_listed {
            self.close_dish_detail();
        }
    }

    fn refresh_suggestion(&mut self) {
        self.suggestion = self
            .location
            .fix
            .as_ref()
            .and_then(|fix| nearest(fix.point, &self.cities).ok())
            .filter(|city| city.id != self.current_city.id)
            .cloned();
    }

    fn city_by_slug(&self, slug: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.slug == slug)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn current_city(&self) -> &City {
        &self.current_city
    }

    pub fn dishes(&self) -> &[Dish] {
        &self.dishes
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn selected_dish(&self) -> Option<&Dish> {
        self.selected_dish.as_ref()
    }

    pub fn modal(&self) -> Modal {
        self.modal
    }

    pub fn modal_visibility(&self) -> ModalVisibility {
        ModalVisibility {
            city_selector: self.modal == Modal::CitySelector,
            dish_detail: self.modal == Modal::DishDetail,
        }
    }

    /// A closer city than the current one, if the last fix found one.
    pub fn suggestion(&self) -> Option<&City> {
        self.suggestion.as_ref()
    }

    pub fn location(&self) -> &LocationState {
        &self.location
    }

    /// Cities matching the selector's search box.
    pub fn filtered_cities(&self) -> Vec<&City> {
        filter_cities(&self.cities, &self.city_query)
    }

    pub fn highlighted_city(&self) -> Option<&City> {
        self.filtered_cities().get(self.city_cursor).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn city(id: &str, slug: &str, name: &str, lat: f64, lon: f64) -> City {
        City {
            id: id.to_string(),
            name: name.to_string(),
            name_romanized: slug[..1].to_uppercase() + &slug[1..],
            slug: slug.to_string(),
            region: "test".to_string(),
            location: GeoPoint::new_unchecked(lat, lon),
            emoji: String::new(),
        }
    }

    fn cities() -> Vec<City> {
        vec![
            city("tyo", "tokyo", "東京", 35.6762, 139.6503),
            city("osa", "osaka", "大阪", 34.6937, 135.5023),
            city("spk", "sapporo", "札幌", 43.0618, 141.3545),
        ]
    }

    fn dish(city_id: &str, rank: u32) -> Dish {
        Dish {
            id: format!("{city_id}-{rank}"),
            name: format!("dish {rank}"),
            romanized_name: format!("Dish {rank}"),
            short_description: String::new(),
            full_description: String::new(),
            image_ref: String::new(),
            rank,
            price_range_local: "¥1,000".to_string(),
            price_range_foreign: "$7".to_string(),
            preparation_note: None,
            cultural_note: None,
            city_id: city_id.to_string(),
            restaurants: Vec::new(),
            order_phrases: Vec::new(),
        }
    }

    fn dishes_for(city_id: &str) -> Vec<Dish> {
        (1..=3).map(|rank| dish(city_id, rank)).collect()
    }

    fn app() -> App {
        App::new(cities(), "tokyo", Duration::from_millis(1000)).unwrap()
    }

    fn load_ticket(commands: &[Command]) -> (u64, City) {
        commands
            .iter()
            .find_map(|c| match c {
                Command::LoadDishes { ticket, city, .. } => Some((*ticket, city.clone())),
                _ => None,
            })
            .expect("no load issued")
    }

    fn started(slug: &str) -> App {
        let mut app = app();
        let commands = app.start(slug);
        let (ticket, city) = load_ticket(&commands);
        app.dishes_loaded(ticket, dishes_for(&city.id));
        app
    }

    fn assert_invariants(app: &App) {
        assert!(app.dishes().iter().all(|d| d.city_id == app.current_city().id));
        let modals = app.modal_visibility();
        assert!(!(modals.city_selector && modals.dish_detail));
        if modals.dish_detail {
            let selected = app.selected_dish().expect("detail open without a dish");
            assert!(app.dishes().iter().any(|d| d.id == selected.id));
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn initial_state_is_default_city_loading() {
        let app = app();
        assert_eq!(app.current_city().slug, "tokyo");
        assert!(app.is_loading());
        assert!(app.dishes().is_empty());
        assert_eq!(app.modal_visibility(), ModalVisibility::default());
    }

    #[test]
    fn unknown_default_falls_back_to_first_city() {
        let app = App::new(cities(), "paris", Duration::ZERO).unwrap();
        assert_eq!(app.current_city().slug, "tokyo");
    }

    #[test]
    fn no_cities_is_an_error() {
        assert!(matches!(
            App::new(Vec::new(), "tokyo", Duration::ZERO),
            Err(GuideError::EmptyCatalog)
        ));
    }

    #[test]
    fn start_restores_saved_city() {
        let mut app = app();
        let commands = app.start("osaka");
        assert!(commands.contains(&Command::RequestLocation));
        let (ticket, city) = load_ticket(&commands);
        assert_eq!(city.slug, "osaka");
        assert!(app.is_loading());

        app.dishes_loaded(ticket, dishes_for("osa"));
        assert_eq!(app.current_city().slug, "osaka");
        assert!(!app.is_loading());
        assert_eq!(app.dishes().len(), 3);
        assert_invariants(&app);
    }

    #[test]
    fn start_with_unknown_saved_city_uses_default() {
        let app = started("atlantis");
        assert_eq!(app.current_city().slug, "tokyo");
        assert!(!app.is_loading());
    }

    #[test]
    fn startup_load_is_immediate() {
        let mut app = app();
        let commands = app.start("tokyo");
        assert!(matches!(
            &commands[0],
            Command::LoadDishes { delay, .. } if *delay == Duration::ZERO
        ));
    }

    #[test]
    fn select_requires_open_selector() {
        let mut app = started("tokyo");
        let osaka = app.cities()[1].clone();
        assert!(matches!(app.select_city(&osaka), Err(GuideError::SelectorClosed)));
        assert_eq!(app.current_city().slug, "tokyo");
    }

    #[test]
    fn select_rejects_city_outside_catalog() {
        let mut app = started("tokyo");
        app.request_city_selector();
        let paris = city("par", "paris", "パリ", 48.85, 2.35);
        assert!(matches!(app.select_city(&paris), Err(GuideError::UnknownCity(_))));
        assert!(app.modal_visibility().city_selector);
    }

    #[test]
    fn select_city_persists_and_clears_list() {
        let mut app = started("tokyo");
        app.request_city_selector();
        let osaka = app.cities()[1].clone();
        let commands = app.select_city(&osaka).unwrap();

        assert!(commands.contains(&Command::PersistCity("osaka".to_string())));
        let (ticket, city) = load_ticket(&commands);
        assert_eq!(city.id, "osa");
        assert!(app.is_loading());
        assert!(app.dishes().is_empty());
        assert!(!app.modal_visibility().city_selector);
        assert_invariants(&app);

        app.dishes_loaded(ticket, dishes_for("osa"));
        assert!(!app.is_loading());
        assert_eq!(app.dishes()[0].city_id, "osa");
    }

    #[test]
    fn superseded_load_never_lands() {
        let mut app = started("tokyo");
        let osaka = app.cities()[1].clone();
        let sapporo = app.cities()[2].clone();

        app.request_city_selector();
        let (first, _) = load_ticket(&app.select_city(&osaka).unwrap());
        app.request_city_selector();
        let (second, _) = load_ticket(&app.select_city(&sapporo).unwrap());

        // The faster, newer load arrives first; the old one trails in.
        app.dishes_loaded(second, dishes_for("spk"));
        app.dishes_loaded(first, dishes_for("osa"));

        assert_eq!(app.current_city().id, "spk");
        assert_eq!(app.dishes().len(), 3);
        assert!(!app.is_loading());
        assert_invariants(&app);
    }

    #[test]
    fn old_load_arriving_first_is_dropped_too() {
        let mut app = started("tokyo");
        let osaka = app.cities()[1].clone();
        let sapporo = app.cities()[2].clone();

        app.request_city_selector();
        let (first, _) = load_ticket(&app.select_city(&osaka).unwrap());
        app.request_city_selector();
        let (second, _) = load_ticket(&app.select_city(&sapporo).unwrap());

        app.dishes_loaded(first, dishes_for("osa"));
        assert!(app.is_loading());
        assert!(app.dishes().is_empty());

        app.dishes_loaded(second, dishes_for("spk"));
        assert_eq!(app.current_city().id, "spk");
        assert!(app.dishes().iter().all(|d| d.city_id == "spk"));
    }

    #[test]
    fn foreign_dishes_are_filtered_out() {
        let mut app = app();
        let (ticket, _) = load_ticket(&app.start("tokyo"));
        let mut mixed = dishes_for("tyo");
        mixed.push(dish("osa", 9));
        app.dishes_loaded(ticket, mixed);
        assert_eq!(app.dishes().len(), 3);
        assert_invariants(&app);
    }

    #[test]
    fn detail_only_opens_for_listed_dish() {
        let mut app = started("tokyo");
        let stranger = dish("osa", 1);
        assert!(matches!(
            app.open_dish_detail(&stranger),
            Err(GuideError::DishNotListed(_))
        ));
        assert!(!app.modal_visibility().dish_detail);
        assert!(app.selected_dish().is_none());

        let listed = app.dishes()[1].clone();
        app.open_dish_detail(&listed).unwrap();
        assert!(app.modal_visibility().dish_detail);
        assert_eq!(app.selected_dish().map(|d| d.id.as_str()), Some("tyo-2"));
        assert_invariants(&app);

        app.close_dish_detail();
        assert!(!app.modal_visibility().dish_detail);
        assert!(app.selected_dish().is_none());
    }

    #[test]
    fn one_overlay_at_a_time() {
        let mut app = started("tokyo");
        let first = app.dishes()[0].clone();
        app.open_dish_detail(&first).unwrap();
        app.request_city_selector();
        assert_eq!(app.modal(), Modal::CitySelector);
        assert!(app.selected_dish().is_none());
        assert_invariants(&app);

        app.close_city_selector();
        assert_eq!(app.modal(), Modal::None);
        assert_eq!(app.current_city().slug, "tokyo");
    }

    #[test]
    fn location_failures_change_nothing_visible() {
        for error in [
            LocationError::Unavailable,
            LocationError::PermissionDenied,
            LocationError::Timeout,
        ] {
            let mut app = started("tokyo");
            app.location_resolved(Err(error));
            assert_eq!(app.current_city().slug, "tokyo");
            assert_eq!(app.modal_visibility(), ModalVisibility::default());
            assert!(app.suggestion().is_none());
            assert_eq!(app.location().error, Some(error));
            assert!(!app.location().loading);
        }
    }

    #[test]
    fn nearer_city_is_suggested_not_applied() {
        let mut app = started("tokyo");
        let umeda = GeoPoint::new_unchecked(34.70, 135.49);
        app.location_resolved(Ok(Fix::now(umeda, Some(30.0))));

        assert_eq!(app.current_city().slug, "tokyo");
        assert_eq!(app.suggestion().map(|c| c.slug.as_str()), Some("osaka"));
        assert_eq!(app.modal_visibility(), ModalVisibility::default());
    }

    #[test]
    fn no_suggestion_when_already_nearest() {
        let mut app = started("tokyo");
        let shibuya = GeoPoint::new_unchecked(35.66, 139.70);
        app.location_resolved(Ok(Fix::now(shibuya, None)));
        assert!(app.suggestion().is_none());
    }

    #[test]
    fn choosing_the_suggested_city_clears_it() {
        let mut app = started("tokyo");
        app.location_resolved(Ok(Fix::now(GeoPoint::new_unchecked(34.70, 135.49), None)));
        app.request_city_selector();
        let osaka = app.cities()[1].clone();
        app.select_city(&osaka).unwrap();
        assert!(app.suggestion().is_none());

        // Moving away again brings it back.
        app.request_city_selector();
        let sapporo = app.cities()[2].clone();
        app.select_city(&sapporo).unwrap();
        assert_eq!(app.suggestion().map(|c| c.id.as_str()), Some("osa"));
    }

    #[test]
    fn keyboard_drives_city_switch() {
        let mut app = started("tokyo");
        assert!(app.handle_key(key(KeyCode::Char('c'))).is_empty());
        assert!(app.modal_visibility().city_selector);
        assert_eq!(app.highlighted_city().map(|c| c.id.as_str()), Some("tyo"));

        for c in "sap".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(app.filtered_cities().len(), 1);

        let commands = app.handle_key(key(KeyCode::Enter));
        assert!(commands.contains(&Command::PersistCity("sapporo".to_string())));
        assert_eq!(app.current_city().id, "spk");
        assert!(!app.modal_visibility().city_selector);
    }

    #[test]
    fn keyboard_opens_and_closes_detail() {
        let mut app = started("tokyo");
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.selected_dish().map(|d| d.rank), Some(2));

        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.modal_visibility().dish_detail);
        assert!(!app.should_quit);

        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn list_cursor_wraps() {
        let mut app = started("tokyo");
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_index, 2);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.selected_index, 0);
    }
}
