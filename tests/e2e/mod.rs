mod full_system_tests;
