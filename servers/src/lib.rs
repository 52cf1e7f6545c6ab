pub mod meteo_logic;
