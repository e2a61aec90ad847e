pub mod user;
pub mod cinema;
pub mod film;
pub mod showtime;
pub mod seat;
pub mod booking;
pub mod report;

pub use user::{Role, User};
pub use cinema::{Cinema, CinemaSummary, Screen};
pub use film::{Film, FilmListing};
pub use showtime::{ScheduledShowtime, Showtime, ShowtimeDetails};
pub use seat::{Seat, SeatCategory, SeatLayout, SeatView};
pub use booking::{BookedSeat, BookingGroup, Cancellation, Customer};
pub use report::{CitySummary, FilmBookings, FilmRevenue, MonthlyRevenue, StaffPerformance};
